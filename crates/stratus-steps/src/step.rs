//! The step abstraction shared by every step kind.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::StepError;
use crate::events::StepNotifier;

/// What a running step gets to see of its pipeline.
pub struct StepContext<'a> {
  pub cancel: CancellationToken,
  pub notifier: &'a dyn StepNotifier,
}

/// One unit of work in a pipeline.
///
/// `Display` is the human-readable description used in logs, for example
/// `[Action ensureResourceGroup]`.
#[async_trait]
pub trait Step: fmt::Display + Send + Sync {
  async fn run(&self, ctx: &StepContext<'_>) -> Result<(), StepError>;

  /// Stable identifier used as the key in step timings.
  fn metrics_name(&self) -> String;
}

/// Race `fut` against cancellation.
pub(crate) async fn cancellable<F, T>(cancel: &CancellationToken, fut: F) -> Result<T, StepError>
where
  F: Future<Output = T>,
{
  tokio::select! {
    biased;
    _ = cancel.cancelled() => Err(StepError::Cancelled),
    out = fut => Ok(out),
  }
}

/// Sleep until `deadline` unless cancelled first.
pub(crate) async fn sleep_until(
  cancel: &CancellationToken,
  deadline: Instant,
) -> Result<(), StepError> {
  cancellable(cancel, tokio::time::sleep_until(deadline)).await
}
