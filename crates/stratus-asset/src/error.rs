//! Asset graph errors.

/// Opaque error returned by asset generators and file fetchers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while resolving, encoding or decoding assets.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
  /// An asset's generator failed.
  #[error("failed to generate asset '{asset}': {source}")]
  Generate {
    asset: &'static str,
    #[source]
    source: BoxError,
  },

  /// An asset's file loader failed.
  #[error("failed to load asset '{asset}' from files: {source}")]
  Load {
    asset: &'static str,
    #[source]
    source: BoxError,
  },

  /// The dependency declarations form a cycle.
  #[error("dependency cycle detected: {path}")]
  Cycle { path: String },

  /// Two different Rust types declare the same asset name.
  #[error("asset name '{name}' is declared by both {existing} and {incoming}")]
  NameCollision {
    name: &'static str,
    existing: &'static str,
    incoming: &'static str,
  },

  /// A generator asked for an asset that has not been resolved.
  #[error("asset '{0}' has not been resolved")]
  Unresolved(&'static str),

  /// A requested asset is absent from the persisted graph.
  #[error("asset '{0}' is missing from the persisted graph")]
  MissingAsset(String),

  /// Serializing an asset failed.
  #[error("failed to encode asset '{asset}': {source}")]
  Encode {
    asset: &'static str,
    #[source]
    source: serde_json::Error,
  },

  /// A persisted entry does not decode into the requested type.
  #[error("failed to decode asset '{asset}': {source}")]
  Decode {
    asset: &'static str,
    #[source]
    source: serde_json::Error,
  },
}
