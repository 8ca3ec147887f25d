use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default polling and retry bounds applied to pipeline steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepDefaults {
  /// Interval between condition polls.
  pub condition_poll_interval_ms: u64,
  /// Wait between authorization refresh attempts.
  pub authorization_poll_interval_ms: u64,
  /// How long authorization errors keep triggering a refresh. Sized for
  /// control-plane role propagation, which can take several minutes.
  pub authorization_retry_timeout_ms: u64,
}

impl Default for StepDefaults {
  fn default() -> Self {
    Self {
      condition_poll_interval_ms: 10_000,
      authorization_poll_interval_ms: 30_000,
      authorization_retry_timeout_ms: 600_000,
    }
  }
}

impl StepDefaults {
  pub fn condition_poll_interval(&self) -> Duration {
    Duration::from_millis(self.condition_poll_interval_ms)
  }

  pub fn authorization_poll_interval(&self) -> Duration {
    Duration::from_millis(self.authorization_poll_interval_ms)
  }

  pub fn authorization_retry_timeout(&self) -> Duration {
    Duration::from_millis(self.authorization_retry_timeout_ms)
  }
}
