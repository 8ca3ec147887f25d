//! Plain actions.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::StepError;
use crate::step::{Step, StepContext, cancellable};

pub(crate) type ActionFn =
  Box<dyn Fn(CancellationToken) -> BoxFuture<'static, Result<(), StepError>> + Send + Sync>;

pub(crate) fn boxed_action<F, Fut>(f: F) -> ActionFn
where
  F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<(), StepError>> + Send + 'static,
{
  Box::new(move |cancel| Box::pin(f(cancel)))
}

/// Runs a function once and returns its result unmodified.
pub struct Action {
  name: String,
  f: ActionFn,
}

impl Action {
  pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
  where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), StepError>> + Send + 'static,
  {
    Self {
      name: name.into(),
      f: boxed_action(f),
    }
  }
}

#[async_trait]
impl Step for Action {
  async fn run(&self, ctx: &StepContext<'_>) -> Result<(), StepError> {
    cancellable(&ctx.cancel, (self.f)(ctx.cancel.clone())).await?
  }

  fn metrics_name(&self) -> String {
    format!("action.{}", self.name)
  }
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[Action {}]", self.name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::events::NoopNotifier;

  fn ctx(cancel: &CancellationToken) -> StepContext<'static> {
    StepContext {
      cancel: cancel.clone(),
      notifier: &NoopNotifier,
    }
  }

  #[tokio::test]
  async fn test_action_returns_result_unmodified() {
    let cancel = CancellationToken::new();
    let ok = Action::new("ensureResourceGroup", |_| async { Ok(()) });
    assert!(ok.run(&ctx(&cancel)).await.is_ok());

    let failing = Action::new("createDNS", |_| async {
      Err(StepError::other("zone is locked"))
    });
    let err = failing.run(&ctx(&cancel)).await.unwrap_err();
    assert_eq!(err.to_string(), "zone is locked");
  }

  #[test]
  fn test_action_description() {
    let action = Action::new("ensureResourceGroup", |_| async { Ok(()) });
    assert_eq!(action.to_string(), "[Action ensureResourceGroup]");
    assert_eq!(action.metrics_name(), "action.ensureResourceGroup");
  }

  #[tokio::test(start_paused = true)]
  async fn test_action_honors_cancellation() {
    let cancel = CancellationToken::new();
    let action = Action::new("hang", |_| futures::future::pending());

    let trigger = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(std::time::Duration::from_secs(5)).await;
      trigger.cancel();
    });

    let err = action.run(&ctx(&cancel)).await.unwrap_err();
    assert!(matches!(err, StepError::Cancelled));
  }
}
