//! Polling conditions.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::StepError;
use crate::events::StepEvent;
use crate::step::{Step, StepContext, cancellable, sleep_until};

/// Interval between polls unless overridden.
pub const DEFAULT_CONDITION_POLL_INTERVAL: Duration = Duration::from_secs(10);

type ConditionFn =
  Box<dyn Fn(CancellationToken) -> BoxFuture<'static, Result<bool, StepError>> + Send + Sync>;

/// Polls a predicate until it holds or `timeout` elapses.
///
/// The first poll happens immediately. A poll that errors ends the step
/// with that error; a poll that hit its own deadline is reported as
/// [`StepError::InternalTimeout`] so it is not confused with the
/// condition giving up. When the timeout elapses the step fails with
/// [`StepError::Timeout`], or, if `fail` is false, logs a warning and
/// succeeds.
pub struct Condition {
  name: String,
  f: ConditionFn,
  timeout: Duration,
  fail: bool,
  poll_interval: Duration,
  hint: Option<String>,
}

impl Condition {
  pub fn new<F, Fut>(name: impl Into<String>, f: F, timeout: Duration, fail: bool) -> Self
  where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, StepError>> + Send + 'static,
  {
    Self {
      name: name.into(),
      f: Box::new(move |cancel| Box::pin(f(cancel))),
      timeout,
      fail,
      poll_interval: DEFAULT_CONDITION_POLL_INTERVAL,
      hint: None,
    }
  }

  pub fn with_poll_interval(mut self, interval: Duration) -> Self {
    self.poll_interval = interval;
    self
  }

  /// Attach a remediation hint to the timeout error.
  pub fn with_timeout_hint(mut self, hint: impl Into<String>) -> Self {
    self.hint = Some(hint.into());
    self
  }

  async fn poll_until_deadline(&self, cancel: &CancellationToken) -> Result<bool, StepError> {
    let deadline = Instant::now() + self.timeout;
    loop {
      match cancellable(cancel, (self.f)(cancel.clone())).await? {
        Ok(true) => return Ok(true),
        Ok(false) => {}
        Err(err) if err.is_deadline_exceeded() => {
          return Err(StepError::InternalTimeout(Box::new(err)));
        }
        Err(err) => return Err(err),
      }

      let next = Instant::now() + self.poll_interval;
      if next >= deadline {
        sleep_until(cancel, deadline).await?;
        return Ok(false);
      }
      debug!(step = %self, "condition not met yet");
      sleep_until(cancel, next).await?;
    }
  }
}

#[async_trait]
impl Step for Condition {
  async fn run(&self, ctx: &StepContext<'_>) -> Result<(), StepError> {
    if self.poll_until_deadline(&ctx.cancel).await? {
      return Ok(());
    }

    let err = StepError::Timeout {
      step: self.name.clone(),
      hint: self.hint.clone(),
    };
    if self.fail {
      return Err(err);
    }

    warn!(
      step = %self,
      error = %err,
      "step failed but has configured 'fail=false', continuing"
    );
    ctx.notifier.notify(StepEvent::ConditionSkipped {
      step: self.to_string(),
    });
    Ok(())
  }

  fn metrics_name(&self) -> String {
    format!("condition.{}", self.name)
  }
}

impl fmt::Display for Condition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[Condition {}, timeout {:?}]", self.name, self.timeout)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::{Arc, Mutex};

  use tokio::sync::mpsc;

  use super::*;
  use crate::events::{ChannelNotifier, NoopNotifier};

  fn ctx(cancel: &CancellationToken) -> StepContext<'static> {
    StepContext {
      cancel: cancel.clone(),
      notifier: &NoopNotifier,
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_polls_immediately_then_on_interval() {
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&polls);
    let started = Instant::now();

    let condition = Condition::new(
      "apiServerReady",
      move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move { Ok(n == 3) }
      },
      Duration::from_secs(60),
      true,
    );

    condition.run(&ctx(&CancellationToken::new())).await.unwrap();
    assert_eq!(polls.load(Ordering::SeqCst), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(20));
  }

  #[tokio::test(start_paused = true)]
  async fn test_timeout_fails_when_fail_is_true() {
    let condition = Condition::new(
      "bootstrapFinished",
      |_| async { Ok(false) },
      Duration::from_millis(50),
      true,
    )
    .with_poll_interval(Duration::from_millis(10))
    .with_timeout_hint("check the bootstrap node console");

    let err = condition
      .run(&ctx(&CancellationToken::new()))
      .await
      .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(
      err.to_string(),
      "timed out waiting for the condition: check the bootstrap node console"
    );
  }

  #[tokio::test(start_paused = true)]
  async fn test_timeout_is_skipped_when_fail_is_false() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let notifier = ChannelNotifier::new(tx);
    let condition = Condition::new(
      "consoleReachable",
      |_| async { Ok(false) },
      Duration::from_millis(50),
      false,
    );

    let ctx = StepContext {
      cancel: CancellationToken::new(),
      notifier: &notifier,
    };
    condition.run(&ctx).await.unwrap();

    assert_eq!(
      rx.try_recv().unwrap(),
      StepEvent::ConditionSkipped {
        step: condition.to_string()
      }
    );
  }

  #[tokio::test(start_paused = true)]
  async fn test_inner_deadline_is_internal_timeout() {
    let condition = Condition::new(
      "clusterVersionReady",
      |_| async {
        tokio::time::timeout(Duration::from_secs(1), futures::future::pending::<()>()).await?;
        Ok::<bool, StepError>(true)
      },
      Duration::from_secs(600),
      false,
    );

    let err = condition
      .run(&ctx(&CancellationToken::new()))
      .await
      .unwrap_err();
    assert!(matches!(err, StepError::InternalTimeout(_)));
    assert!(!err.is_timeout());
  }

  #[tokio::test(start_paused = true)]
  async fn test_wrapped_inner_deadline_is_internal_timeout() {
    let condition = Condition::new(
      "ingressReady",
      |_| async {
        tokio::time::timeout(Duration::from_secs(1), futures::future::pending::<()>())
          .await
          .map_err(StepError::other)?;
        Ok::<bool, StepError>(true)
      },
      Duration::from_secs(600),
      true,
    );

    let err = condition
      .run(&ctx(&CancellationToken::new()))
      .await
      .unwrap_err();
    assert!(matches!(err, StepError::InternalTimeout(_)));
    assert!(
      err
        .to_string()
        .starts_with("condition encountered internal timeout: ")
    );
  }

  #[tokio::test(flavor = "current_thread", start_paused = true)]
  async fn test_skipped_timeout_logs_warning() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
      .with_writer(logs.clone())
      .with_ansi(false)
      .with_max_level(tracing::Level::WARN)
      .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let condition = Condition::new(
      "consoleReachable",
      |_| async { Ok(false) },
      Duration::from_millis(50),
      false,
    );
    condition
      .run(&ctx(&CancellationToken::new()))
      .await
      .unwrap();

    let output = logs.contents();
    assert!(output.contains("WARN"), "no warning logged: {output}");
    assert!(output.contains("fail=false"), "unexpected log: {output}");
    assert!(output.contains("[Condition consoleReachable"), "unexpected log: {output}");
  }

  #[derive(Clone, Default)]
  struct LogBuffer(Arc<Mutex<Vec<u8>>>);

  impl LogBuffer {
    fn contents(&self) -> String {
      String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
  }

  impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
      self.0.lock().unwrap().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
      self.clone()
    }
  }

  #[tokio::test]
  async fn test_poll_error_is_returned() {
    let condition = Condition::new(
      "operatorsAvailable",
      |_| async { Err(StepError::other("list failed")) },
      Duration::from_secs(60),
      false,
    );
    let err = condition
      .run(&ctx(&CancellationToken::new()))
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "list failed");
  }

  #[tokio::test(start_paused = true)]
  async fn test_cancellation_during_wait() {
    let cancel = CancellationToken::new();
    let condition = Condition::new(
      "neverReady",
      |_| async { Ok(false) },
      Duration::from_secs(3600),
      true,
    );

    let trigger = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_secs(25)).await;
      trigger.cancel();
    });

    let err = condition.run(&ctx(&cancel)).await.unwrap_err();
    assert!(matches!(err, StepError::Cancelled));
  }

  #[test]
  fn test_condition_description() {
    let condition = Condition::new(
      "apiServerReady",
      |_| async { Ok(true) },
      Duration::from_secs(30),
      true,
    );
    assert_eq!(condition.to_string(), "[Condition apiServerReady, timeout 30s]");
    assert_eq!(condition.metrics_name(), "condition.apiServerReady");
  }
}
