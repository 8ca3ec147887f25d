use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where persisted blobs live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
  /// Root directory of the filesystem blob store.
  ///
  /// Defaults to `~/.stratus/blobs`, or `./.stratus/blobs` when no home
  /// directory can be determined.
  pub root: PathBuf,
}

impl Default for StorageConfig {
  fn default() -> Self {
    let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    Self {
      root: base.join(".stratus").join("blobs"),
    }
  }
}
