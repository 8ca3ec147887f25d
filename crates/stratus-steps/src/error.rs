//! Step errors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque error from an action, a poll function or an authorizer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Authorization failures that are expected to clear once credentials or
/// role assignments have propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationErrorKind {
  /// The client is not yet known to the identity provider.
  UnauthorizedClient,
  /// A role assignment has not propagated yet.
  AuthorizationFailed,
  /// The client secret is not (yet) valid.
  InvalidSecret,
  /// The action explicitly asked for fresh credentials.
  RefreshRequested,
}

impl fmt::Display for AuthorizationErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Self::UnauthorizedClient => "unauthorized client",
      Self::AuthorizationFailed => "authorization failed",
      Self::InvalidSecret => "invalid client secret",
      Self::RefreshRequested => "credential refresh requested",
    };
    f.write_str(s)
  }
}

/// Errors returned by steps and by the runner.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
  /// A classified, possibly transient, authorization failure.
  #[error("{kind}: {message}")]
  Authorization {
    kind: AuthorizationErrorKind,
    message: String,
  },

  /// A deadline internal to an action or poll function expired.
  #[error("context deadline exceeded")]
  DeadlineExceeded,

  /// A condition's poll function hit its own deadline. Distinct from
  /// [`StepError::Timeout`], which is the condition giving up.
  #[error("condition encountered internal timeout: {0}")]
  InternalTimeout(#[source] Box<StepError>),

  /// A condition was not met before its timeout.
  #[error("timed out waiting for the condition{}", hint_suffix(.hint))]
  Timeout { step: String, hint: Option<String> },

  /// Rebuilding the authorizer failed.
  #[error("failed to refresh authorizer: {0}")]
  Refresh(#[source] BoxError),

  /// The pipeline was cancelled.
  #[error("step cancelled")]
  Cancelled,

  /// Any other failure, passed through unchanged.
  #[error(transparent)]
  Other(#[from] BoxError),
}

fn hint_suffix(hint: &Option<String>) -> String {
  hint.as_ref().map(|h| format!(": {h}")).unwrap_or_default()
}

impl StepError {
  /// Wrap an arbitrary error.
  pub fn other(err: impl Into<BoxError>) -> Self {
    Self::Other(err.into())
  }

  pub fn authorization(kind: AuthorizationErrorKind, message: impl Into<String>) -> Self {
    Self::Authorization {
      kind,
      message: message.into(),
    }
  }

  /// Ask an [`AuthorizationRetryingAction`](crate::AuthorizationRetryingAction)
  /// to rebuild credentials and retry.
  pub fn refresh_requested() -> Self {
    Self::authorization(
      AuthorizationErrorKind::RefreshRequested,
      "action requested fresh credentials",
    )
  }

  /// The authorization failure class, if this error is one.
  pub fn authorization_kind(&self) -> Option<AuthorizationErrorKind> {
    match self {
      Self::Authorization { kind, .. } => Some(*kind),
      _ => None,
    }
  }

  /// True for a deadline expiry, including one wrapped in [`StepError::Other`]
  /// or anywhere in that error's `source()` chain.
  pub fn is_deadline_exceeded(&self) -> bool {
    match self {
      Self::DeadlineExceeded => true,
      Self::Other(err) => chain_has_deadline(err.as_ref()),
      _ => false,
    }
  }

  pub fn is_timeout(&self) -> bool {
    matches!(self, Self::Timeout { .. })
  }
}

fn chain_has_deadline(err: &(dyn std::error::Error + 'static)) -> bool {
  let mut current = Some(err);
  while let Some(err) = current {
    if err.is::<tokio::time::error::Elapsed>()
      || matches!(err.downcast_ref::<StepError>(), Some(StepError::DeadlineExceeded))
    {
      return true;
    }
    current = err.source();
  }
  false
}

impl From<tokio::time::error::Elapsed> for StepError {
  fn from(_: tokio::time::error::Elapsed) -> Self {
    Self::DeadlineExceeded
  }
}
