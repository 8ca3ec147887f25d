use serde::{Deserialize, Serialize};

/// How the graph encryption key is supplied.
///
/// The key itself never appears in the config file; only the name of the
/// environment variable holding it (32 bytes, base64 encoded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
  pub key_env: String,
}

impl Default for EncryptionConfig {
  fn default() -> Self {
    Self {
      key_env: "STRATUS_GRAPH_KEY".to_string(),
    }
  }
}
