//! Sequential execution of a step list.

use std::error::Error as _;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::StepError;
use crate::events::{NoopNotifier, StepEvent, StepNotifier};
use crate::step::{Step, StepContext};

/// Wall-clock time spent in one successful step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTiming {
  /// The step's [`Step::metrics_name`].
  pub step: String,
  pub elapsed: Duration,
}

/// Runs steps strictly in order, stopping at the first failure.
///
/// # Usage
///
/// ```ignore
/// let runner = Runner::new();
/// let steps: Vec<Box<dyn Step>> = vec![
///   Box::new(Action::new("ensureResourceGroup", ensure_resource_group)),
///   Box::new(Condition::new("apiServerReady", api_server_ready, timeout, true)),
/// ];
/// let timings = runner.run(&steps, &CancellationToken::new()).await?;
/// ```
pub struct Runner<N: StepNotifier = NoopNotifier> {
  notifier: N,
}

impl Runner<NoopNotifier> {
  pub fn new() -> Self {
    Self {
      notifier: NoopNotifier,
    }
  }
}

impl Default for Runner<NoopNotifier> {
  fn default() -> Self {
    Self::new()
  }
}

impl<N: StepNotifier> Runner<N> {
  pub fn with_notifier(notifier: N) -> Self {
    Self { notifier }
  }

  /// Execute `steps` in order.
  ///
  /// Returns the timings of every step on success. On failure the failing
  /// step's error is returned unchanged and no later step runs.
  #[instrument(name = "steps_run", skip_all, fields(run_id = %Uuid::new_v4(), steps = steps.len()))]
  pub async fn run(
    &self,
    steps: &[Box<dyn Step>],
    cancel: &CancellationToken,
  ) -> Result<Vec<StepTiming>, StepError> {
    let ctx = StepContext {
      cancel: cancel.clone(),
      notifier: &self.notifier,
    };
    let mut timings = Vec::with_capacity(steps.len());

    for step in steps {
      if cancel.is_cancelled() {
        warn!(step = %step, "pipeline cancelled before step");
        return Err(StepError::Cancelled);
      }

      info!(step = %step, "running step");
      self.notifier.notify(StepEvent::StepStarted {
        step: step.to_string(),
      });

      let started = Instant::now();
      match step.run(&ctx).await {
        Ok(()) => {
          let elapsed = started.elapsed();
          info!(
            step = %step,
            elapsed_ms = elapsed.as_millis() as u64,
            "step completed"
          );
          self.notifier.notify(StepEvent::StepCompleted {
            step: step.to_string(),
            elapsed,
          });
          timings.push(StepTiming {
            step: step.metrics_name(),
            elapsed,
          });
        }
        Err(err) => {
          error!(step = %step, error = %err, "step encountered error");
          log_causes(&err);
          self.notifier.notify(StepEvent::StepFailed {
            step: step.to_string(),
            error: err.to_string(),
          });
          return Err(err);
        }
      }
    }

    Ok(timings)
  }
}

fn log_causes(err: &StepError) {
  let mut source = err.source();
  while let Some(cause) = source {
    error!(cause = %cause, "caused by");
    source = cause.source();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::action::Action;

  #[tokio::test]
  async fn test_empty_pipeline() {
    let timings = Runner::new()
      .run(&[], &CancellationToken::new())
      .await
      .unwrap();
    assert!(timings.is_empty());
  }

  #[tokio::test]
  async fn test_cancelled_before_first_step() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let steps: Vec<Box<dyn Step>> = vec![Box::new(Action::new("never", |_| async {
      Err(StepError::other("ran after cancellation"))
    }))];

    let err = Runner::new().run(&steps, &cancel).await.unwrap_err();
    assert!(matches!(err, StepError::Cancelled));
  }
}
