//! Step events and notifiers.
//!
//! The runner and the individual steps report progress through a
//! [`StepNotifier`], so callers can persist timings or surface skipped
//! conditions without scraping logs.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::AuthorizationErrorKind;

/// Events emitted while a pipeline runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepEvent {
  /// A step is about to run.
  StepStarted { step: String },

  /// A step finished successfully.
  StepCompleted { step: String, elapsed: Duration },

  /// A step failed and the pipeline stopped.
  StepFailed { step: String, error: String },

  /// A non-fatal condition timed out and was skipped.
  ConditionSkipped { step: String },

  /// An authorization-retrying action rebuilt its credentials.
  AuthorizationRefreshed {
    step: String,
    kind: AuthorizationErrorKind,
  },
}

/// Receives step events.
pub trait StepNotifier: Send + Sync {
  fn notify(&self, event: StepEvent);
}

impl<T: StepNotifier + ?Sized> StepNotifier for Box<T> {
  fn notify(&self, event: StepEvent) {
    (**self).notify(event)
  }
}

impl<T: StepNotifier + ?Sized> StepNotifier for std::sync::Arc<T> {
  fn notify(&self, event: StepEvent) {
    (**self).notify(event)
  }
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl StepNotifier for NoopNotifier {
  fn notify(&self, _event: StepEvent) {}
}

/// Forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls a step.
  sender: mpsc::UnboundedSender<StepEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<StepEvent>) -> Self {
    Self { sender }
  }
}

impl StepNotifier for ChannelNotifier {
  fn notify(&self, event: StepEvent) {
    // Receiver may have been dropped.
    let _ = self.sender.send(event);
  }
}
