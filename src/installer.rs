//! Installer facade.

use std::future::Future;
use std::sync::Arc;

use stratus_asset::{Asset, AssetError, AssetGraph};
use stratus_blob::{FsStore, Store};
use stratus_config::{InstallerConfig, StepDefaults};
use stratus_graph_store::{Aead, AeadError, AesGcmAead, BootstrapAsset, Manager, Scope};
use stratus_steps::{
  Action, AuthorizationRetryingAction, Authorizer, CancellationToken, Condition, NoopNotifier,
  Runner, Step, StepError, StepNotifier, StepTiming,
};
use tracing::{debug, info};

/// Errors that can occur while building an [`Installer`].
#[derive(Debug, thiserror::Error)]
pub enum InstallerError {
  #[error("graph encryption key environment variable '{env}' is not set")]
  MissingKey { env: String },

  #[error("invalid graph encryption key in '{env}'")]
  InvalidKey {
    env: String,
    #[source]
    source: AeadError,
  },
}

/// Builds steps with the configured defaults and runs them.
///
/// `B` is the asset published as the unencrypted bootstrap payload.
pub struct Installer<B: BootstrapAsset> {
  manager: Manager<B>,
  defaults: StepDefaults,
  runner: Runner<Arc<dyn StepNotifier>>,
}

impl<B: BootstrapAsset> Installer<B> {
  /// Build an installer backed by the filesystem blob store.
  ///
  /// The graph key is read, base64 encoded, from the environment variable
  /// named in the config.
  pub fn from_config(config: &InstallerConfig) -> Result<Self, InstallerError> {
    let env = &config.encryption.key_env;
    let key = std::env::var(env).map_err(|_| InstallerError::MissingKey { env: env.clone() })?;
    let aead = AesGcmAead::from_base64_key(&key).map_err(|source| {
      InstallerError::InvalidKey {
        env: env.clone(),
        source,
      }
    })?;

    info!(root = %config.storage.root.display(), "using filesystem blob store");
    Ok(Self::new(
      Arc::new(FsStore::new(&config.storage.root)),
      Arc::new(aead),
      config.steps,
    ))
  }

  pub fn new(store: Arc<dyn Store>, aead: Arc<dyn Aead>, defaults: StepDefaults) -> Self {
    Self {
      manager: Manager::new(store, aead),
      defaults,
      runner: Runner::with_notifier(Arc::new(NoopNotifier) as Arc<dyn StepNotifier>),
    }
  }

  /// Report step events to `notifier` instead of discarding them.
  pub fn with_notifier(mut self, notifier: Arc<dyn StepNotifier>) -> Self {
    self.runner = Runner::with_notifier(notifier);
    self
  }

  pub fn manager(&self) -> &Manager<B> {
    &self.manager
  }

  pub fn defaults(&self) -> StepDefaults {
    self.defaults
  }

  pub fn action<F, Fut>(&self, name: impl Into<String>, f: F) -> Box<dyn Step>
  where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), StepError>> + Send + 'static,
  {
    Box::new(Action::new(name, f))
  }

  /// A condition polled at the configured interval.
  pub fn condition<F, Fut>(
    &self,
    name: impl Into<String>,
    f: F,
    timeout: std::time::Duration,
    fail: bool,
  ) -> Box<dyn Step>
  where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, StepError>> + Send + 'static,
  {
    Box::new(
      Condition::new(name, f, timeout, fail)
        .with_poll_interval(self.defaults.condition_poll_interval()),
    )
  }

  /// An authorization-retrying action using the configured retry timeout
  /// and poll interval.
  pub fn authorization_retrying_action<F, Fut>(
    &self,
    name: impl Into<String>,
    authorizer: Arc<dyn Authorizer>,
    f: F,
  ) -> Box<dyn Step>
  where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), StepError>> + Send + 'static,
  {
    Box::new(
      AuthorizationRetryingAction::new(name, authorizer, f)
        .with_retry_timeout(self.defaults.authorization_retry_timeout())
        .with_poll_interval(self.defaults.authorization_poll_interval()),
    )
  }

  /// A step that builds a fresh graph, seeds it, resolves `root` and saves
  /// the result for `scope`.
  pub fn persist_graph_step<R, S>(
    &self,
    name: impl Into<String>,
    scope: Scope,
    seed: S,
    root: R,
  ) -> Box<dyn Step>
  where
    R: Asset + Clone,
    S: Fn(&mut AssetGraph) -> Result<(), AssetError> + Send + Sync + 'static,
  {
    let manager = self.manager.clone();
    let seed = Arc::new(seed);
    self.action(name, move |_| {
      let manager = manager.clone();
      let scope = scope.clone();
      let seed = Arc::clone(&seed);
      let root = root.clone();
      async move {
        let mut graph = AssetGraph::new();
        (*seed)(&mut graph).map_err(StepError::other)?;
        graph.resolve(root).await.map_err(StepError::other)?;
        debug!(assets = graph.len(), scope = %scope, "resolved asset graph");
        manager.save(&scope, &graph).await.map_err(StepError::other)
      }
    })
  }

  /// Run `steps` in order, stopping at the first failure.
  pub async fn run(
    &self,
    steps: &[Box<dyn Step>],
    cancel: &CancellationToken,
  ) -> Result<Vec<StepTiming>, StepError> {
    self.runner.run(steps, cancel).await
  }
}
