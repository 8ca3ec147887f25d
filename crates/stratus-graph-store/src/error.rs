//! Graph store errors.

use stratus_asset::AssetError;

use crate::aead::AeadError;
use crate::manager::Scope;

/// Errors that can occur while saving or loading a persisted graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphStoreError {
  /// The graph does not contain the bootstrap asset.
  #[error("graph has no '{0}' asset to publish as bootstrap payload")]
  MissingBootstrap(&'static str),

  /// Nothing has been persisted for the scope.
  #[error("no persisted graph for scope '{0}'")]
  NotPersisted(Scope),

  /// An asset could not be serialized.
  #[error(transparent)]
  Asset(#[from] AssetError),

  /// The graph could not be serialized to JSON.
  #[error("failed to encode graph: {0}")]
  Encode(#[source] serde_json::Error),

  /// The decrypted payload is not a valid persisted graph.
  #[error("malformed persisted graph: {0}")]
  Decode(#[source] serde_json::Error),

  /// Sealing failed or the stored ciphertext did not authenticate.
  #[error("graph encryption: {0}")]
  Aead(#[from] AeadError),

  /// The blob store failed.
  #[error("blob storage: {0}")]
  Blob(#[from] stratus_blob::Error),
}

impl GraphStoreError {
  /// True when the stored ciphertext failed authentication.
  pub fn is_authentication(&self) -> bool {
    matches!(self, Self::Aead(AeadError::Authentication))
  }
}
