//! Stratus Steps
//!
//! Ordered pipelines of provisioning steps.
//!
//! A pipeline is a list of [`Step`]s run strictly in sequence by a
//! [`Runner`]. Three step kinds are provided:
//!
//! - [`Action`] runs a function once.
//! - [`Condition`] polls a predicate until it holds or a timeout elapses.
//! - [`AuthorizationRetryingAction`] retries a function through transient
//!   authorization failures, rebuilding credentials between attempts.
//!
//! Progress is logged with `tracing` and reported as [`StepEvent`]s to a
//! [`StepNotifier`].

mod action;
mod authorization;
mod condition;
mod error;
mod events;
mod runner;
mod step;

pub use action::Action;
pub use authorization::{
  AuthorizationRetryingAction, Authorizer, DEFAULT_AUTHORIZATION_POLL_INTERVAL,
  DEFAULT_AUTHORIZATION_RETRY_TIMEOUT,
};
pub use condition::{Condition, DEFAULT_CONDITION_POLL_INTERVAL};
pub use error::{AuthorizationErrorKind, BoxError, StepError};
pub use events::{ChannelNotifier, NoopNotifier, StepEvent, StepNotifier};
pub use runner::{Runner, StepTiming};
pub use step::{Step, StepContext};
pub use tokio_util::sync::CancellationToken;
