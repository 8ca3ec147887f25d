//! Persistence of asset graphs: sealed graph blob plus clear bootstrap blob.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use stratus_asset::{Asset, AssetGraph, PersistedGraph};
use stratus_blob::Store;
use tracing::{debug, info, instrument};

use crate::aead::Aead;
use crate::error::GraphStoreError;

const BOOTSTRAP_BLOB: &str = "ignition/bootstrap.ign";
const GRAPH_BLOB: &str = "aro/graph";

/// The one asset published unencrypted.
///
/// Newly booting machines fetch this payload before they hold any key
/// material, so it is uploaded in the clear next to the sealed graph.
pub trait BootstrapAsset: Asset {
  fn bootstrap_payload(&self) -> &[u8];
}

/// Storage coordinates of one cluster's persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
  pub resource_group: String,
  pub account: String,
}

impl Scope {
  pub fn new(resource_group: impl Into<String>, account: impl Into<String>) -> Self {
    Self {
      resource_group: resource_group.into(),
      account: account.into(),
    }
  }

  /// Key of the unencrypted bootstrap payload blob.
  pub fn bootstrap_key(&self) -> String {
    self.key(BOOTSTRAP_BLOB)
  }

  /// Key of the sealed graph blob.
  pub fn graph_key(&self) -> String {
    self.key(GRAPH_BLOB)
  }

  fn key(&self, blob: &str) -> String {
    format!("{}/{}/{}", self.resource_group, self.account, blob)
  }
}

impl fmt::Display for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.resource_group, self.account)
  }
}

/// Saves and loads asset graphs for a cluster scope.
///
/// `B` is the asset whose payload is published in the clear.
pub struct Manager<B: BootstrapAsset> {
  store: Arc<dyn Store>,
  aead: Arc<dyn Aead>,
  _bootstrap: PhantomData<fn() -> B>,
}

impl<B: BootstrapAsset> Clone for Manager<B> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      aead: Arc::clone(&self.aead),
      _bootstrap: PhantomData,
    }
  }
}

impl<B: BootstrapAsset> Manager<B> {
  pub fn new(store: Arc<dyn Store>, aead: Arc<dyn Aead>) -> Self {
    Self {
      store,
      aead,
      _bootstrap: PhantomData,
    }
  }

  /// Whether a sealed graph has been persisted for `scope`.
  ///
  /// Only checks for presence; nothing is downloaded or decrypted.
  pub async fn exists(&self, scope: &Scope) -> Result<bool, GraphStoreError> {
    Ok(self.store.exists(&scope.graph_key()).await?)
  }

  /// Persist `graph` for `scope`.
  ///
  /// Uploads the bootstrap payload in the clear, then the sealed JSON of the
  /// whole graph (bootstrap asset included), replacing any previous graph.
  /// The two uploads are not transactional: a failure after the first leaves
  /// the new bootstrap payload next to the previous graph, and is reported.
  #[instrument(name = "graph_save", skip_all, fields(scope = %scope))]
  pub async fn save(&self, scope: &Scope, graph: &AssetGraph) -> Result<(), GraphStoreError> {
    let bootstrap = graph
      .try_get::<B>()
      .ok_or(GraphStoreError::MissingBootstrap(B::NAME))?;

    let payload = Bytes::copy_from_slice(bootstrap.bootstrap_payload());
    let payload_len = payload.len();
    self
      .store
      .put(
        &scope.bootstrap_key(),
        stratus_blob::once(payload),
        "application/octet-stream",
      )
      .await?;
    debug!(bytes = payload_len, "uploaded bootstrap payload");

    let persisted = graph.to_persisted()?;
    let json = serde_json::to_vec(&persisted).map_err(GraphStoreError::Encode)?;
    let sealed = self.aead.seal(&json)?;

    self
      .store
      .put(
        &scope.graph_key(),
        stratus_blob::once(sealed),
        "application/octet-stream",
      )
      .await?;

    info!(assets = persisted.len(), "persisted asset graph");
    Ok(())
  }

  /// Download, authenticate and lazily decode the graph for `scope`.
  #[instrument(name = "graph_load", skip_all, fields(scope = %scope))]
  pub async fn load_persisted(&self, scope: &Scope) -> Result<PersistedGraph, GraphStoreError> {
    let sealed = self.download(&scope.graph_key(), scope).await?;
    let json = self.aead.open(&sealed)?;
    let persisted: PersistedGraph =
      serde_json::from_slice(&json).map_err(GraphStoreError::Decode)?;

    debug!(assets = persisted.len(), "loaded persisted asset graph");
    Ok(persisted)
  }

  /// Fetch the clear bootstrap payload, as a booting machine would.
  pub async fn load_bootstrap(&self, scope: &Scope) -> Result<Bytes, GraphStoreError> {
    self.download(&scope.bootstrap_key(), scope).await
  }

  /// Remove both blobs for `scope`. Absent blobs are not an error.
  pub async fn delete(&self, scope: &Scope) -> Result<(), GraphStoreError> {
    for key in [scope.graph_key(), scope.bootstrap_key()] {
      match self.store.delete(&key).await {
        Ok(()) | Err(stratus_blob::Error::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
      }
    }
    info!(scope = %scope, "deleted persisted asset graph");
    Ok(())
  }

  async fn download(&self, key: &str, scope: &Scope) -> Result<Bytes, GraphStoreError> {
    let stream = match self.store.get(key).await {
      Ok(stream) => stream,
      Err(stratus_blob::Error::NotFound(_)) => {
        return Err(GraphStoreError::NotPersisted(scope.clone()));
      }
      Err(e) => return Err(e.into()),
    };
    Ok(stratus_blob::read_all(stream).await?)
  }
}
