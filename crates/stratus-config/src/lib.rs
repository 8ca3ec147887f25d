//! Stratus Config
//!
//! This crate contains the serializable installer configuration for stratus.
//! Every field has a default, so an empty JSON object is a valid config.
//!
//! # Example
//!
//! ```json
//! {
//!   "storage": { "root": "/var/lib/stratus/blobs" },
//!   "encryption": { "key_env": "STRATUS_GRAPH_KEY" },
//!   "steps": {
//!     "condition_poll_interval_ms": 10000,
//!     "authorization_poll_interval_ms": 30000,
//!     "authorization_retry_timeout_ms": 600000
//!   }
//! }
//! ```

mod encryption;
mod steps;
mod storage;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use encryption::EncryptionConfig;
pub use steps::StepDefaults;
pub use storage::StorageConfig;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to read config file '{path}'")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config: {0}")]
  Parse(#[from] serde_json::Error),
}

/// Top-level installer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
  pub storage: StorageConfig,
  pub encryption: EncryptionConfig,
  pub steps: StepDefaults,
}

impl InstallerConfig {
  /// Parse a config from a JSON document.
  pub fn from_json(json: &str) -> Result<Self, ConfigError> {
    Ok(serde_json::from_str(json)?)
  }

  /// Read and parse a JSON config file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json(&content)
  }
}
