//! Actions that retry through transient authorization failures.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::action::{ActionFn, boxed_action};
use crate::error::{BoxError, StepError};
use crate::events::StepEvent;
use crate::step::{Step, StepContext, cancellable, sleep_until};

/// Wait between a credential refresh and the next attempt.
pub const DEFAULT_AUTHORIZATION_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// How long after the first attempt authorization failures are still retried.
pub const DEFAULT_AUTHORIZATION_RETRY_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Something that can obtain fresh credentials.
///
/// Implementations typically hold the credential behind a lock that the
/// retried action reads on every attempt.
#[async_trait]
pub trait Authorizer: Send + Sync {
  async fn rebuild(&self) -> Result<(), BoxError>;
}

/// Runs an action, rebuilding credentials and retrying while it fails with a
/// classified authorization error and the retry timeout has not elapsed.
///
/// Any other error, or an authorization error after the timeout, is returned
/// as is.
pub struct AuthorizationRetryingAction {
  name: String,
  authorizer: Arc<dyn Authorizer>,
  f: ActionFn,
  retry_timeout: Duration,
  poll_interval: Duration,
}

impl AuthorizationRetryingAction {
  pub fn new<F, Fut>(name: impl Into<String>, authorizer: Arc<dyn Authorizer>, f: F) -> Self
  where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), StepError>> + Send + 'static,
  {
    Self {
      name: name.into(),
      authorizer,
      f: boxed_action(f),
      retry_timeout: DEFAULT_AUTHORIZATION_RETRY_TIMEOUT,
      poll_interval: DEFAULT_AUTHORIZATION_POLL_INTERVAL,
    }
  }

  pub fn with_retry_timeout(mut self, timeout: Duration) -> Self {
    self.retry_timeout = timeout;
    self
  }

  pub fn with_poll_interval(mut self, interval: Duration) -> Self {
    self.poll_interval = interval;
    self
  }
}

#[async_trait]
impl Step for AuthorizationRetryingAction {
  async fn run(&self, ctx: &StepContext<'_>) -> Result<(), StepError> {
    let deadline = Instant::now() + self.retry_timeout;
    loop {
      let err = match cancellable(&ctx.cancel, (self.f)(ctx.cancel.clone())).await? {
        Ok(()) => return Ok(()),
        Err(err) => err,
      };

      let Some(kind) = err.authorization_kind() else {
        return Err(err);
      };
      if Instant::now() >= deadline {
        return Err(err);
      }

      warn!(
        step = %self,
        kind = %kind,
        error = %err,
        "authorization error, refreshing authorizer"
      );
      cancellable(&ctx.cancel, self.authorizer.rebuild())
        .await?
        .map_err(StepError::Refresh)?;
      ctx.notifier.notify(StepEvent::AuthorizationRefreshed {
        step: self.to_string(),
        kind,
      });

      sleep_until(&ctx.cancel, Instant::now() + self.poll_interval).await?;
    }
  }

  fn metrics_name(&self) -> String {
    format!("authorizationretryingaction.{}", self.name)
  }
}

impl fmt::Display for AuthorizationRetryingAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[AuthorizationRetryingAction {}]", self.name)
  }
}
