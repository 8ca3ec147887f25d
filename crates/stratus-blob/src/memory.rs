use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::{ByteStream, Error, Store, once, read_all, validate_key};

/// In-memory blob store.
///
/// Useful for tests and dry runs. Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryStore {
  blobs: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Snapshot of the raw bytes stored under `key`.
  pub async fn raw(&self, key: &str) -> Option<Bytes> {
    self.blobs.read().await.get(key).cloned()
  }

  /// Replace the raw bytes under `key`, bypassing the stream interface.
  pub async fn insert_raw(&self, key: &str, data: impl Into<Bytes>) {
    self.blobs.write().await.insert(key.to_string(), data.into());
  }

  /// Sorted list of stored keys.
  pub async fn keys(&self) -> Vec<String> {
    let mut keys: Vec<String> = self.blobs.read().await.keys().cloned().collect();
    keys.sort();
    keys
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn get(&self, key: &str) -> Result<ByteStream, Error> {
    validate_key(key)?;
    let data = self
      .blobs
      .read()
      .await
      .get(key)
      .cloned()
      .ok_or_else(|| Error::NotFound(key.to_string()))?;
    Ok(once(data))
  }

  async fn put(&self, key: &str, data: ByteStream, _content_type: &str) -> Result<(), Error> {
    validate_key(key)?;
    let data = read_all(data).await?;
    self.blobs.write().await.insert(key.to_string(), data);
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), Error> {
    validate_key(key)?;
    self
      .blobs
      .write()
      .await
      .remove(key)
      .map(|_| ())
      .ok_or_else(|| Error::NotFound(key.to_string()))
  }

  async fn exists(&self, key: &str) -> Result<bool, Error> {
    validate_key(key)?;
    Ok(self.blobs.read().await.contains_key(key))
  }
}
