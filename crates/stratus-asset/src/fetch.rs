//! Loading previously written asset files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::BoxError;

/// A file read back for [`Asset::load`](crate::Asset::load).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
  pub filename: String,
  pub data: Vec<u8>,
}

/// Source of previously written asset files.
#[async_trait]
pub trait FileFetcher: Send + Sync {
  /// Fetch a file by name. `Ok(None)` means the file does not exist.
  async fn fetch_by_name(&self, name: &str) -> Result<Option<AssetFile>, BoxError>;
}

/// Fetches asset files from a local directory.
pub struct DirFetcher {
  root: PathBuf,
}

impl DirFetcher {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }
}

#[async_trait]
impl FileFetcher for DirFetcher {
  async fn fetch_by_name(&self, name: &str) -> Result<Option<AssetFile>, BoxError> {
    if Path::new(name).is_absolute() || name.split(['/', '\\']).any(|part| part == "..") {
      return Err(format!("file name '{name}' escapes the asset directory").into());
    }

    match tokio::fs::read(self.root.join(name)).await {
      Ok(data) => Ok(Some(AssetFile {
        filename: name.to_string(),
        data,
      })),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }
}
