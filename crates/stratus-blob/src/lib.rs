//! Stratus Blob
//!
//! This crate provides the blob storage trait and implementations for stratus.
//! Blobs are opaque byte payloads (sealed asset graphs, boot payloads) that are
//! addressed by slash-separated keys such as `rg/account/aro/graph`.
//!
//! The [`Store`] trait defines the transport layer for blob storage.
//! Implementations handle the actual storage (filesystem, memory, object
//! storage) while callers decide on the key layout.
//!
//! The trait uses async streaming so large payloads never need to be buffered
//! by the store itself. [`once`] and [`read_all`] bridge to whole-buffer
//! callers.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::pin::Pin;

/// A boxed stream of bytes for blob data.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, Error>> + Send>>;

/// Error type for blob storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested blob was not found.
  #[error("blob not found: {0}")]
  NotFound(String),

  /// The key cannot be mapped onto the backend.
  #[error("invalid blob key: {0}")]
  InvalidKey(String),

  /// An I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Blob storage trait.
///
/// Implementations provide the actual storage backend (filesystem, memory,
/// object storage). A `put` to an existing key replaces the previous blob.
#[async_trait]
pub trait Store: Send + Sync {
  /// Retrieve a blob by key.
  ///
  /// Returns a stream of bytes for efficient handling of large payloads.
  async fn get(&self, key: &str) -> Result<ByteStream, Error>;

  /// Store a blob, overwriting any previous value at `key`.
  async fn put(&self, key: &str, data: ByteStream, content_type: &str) -> Result<(), Error>;

  /// Delete a blob by key.
  async fn delete(&self, key: &str) -> Result<(), Error>;

  /// Check whether a blob exists without downloading it.
  async fn exists(&self, key: &str) -> Result<bool, Error>;
}

/// Wrap an in-memory buffer as a single-chunk [`ByteStream`].
pub fn once(data: impl Into<Bytes>) -> ByteStream {
  let data = data.into();
  Box::pin(futures::stream::once(async move { Ok(data) }))
}

/// Drain a [`ByteStream`] into a single buffer.
pub async fn read_all(mut stream: ByteStream) -> Result<Bytes, Error> {
  let mut buf = BytesMut::new();
  while let Some(chunk) = stream.next().await {
    buf.extend_from_slice(&chunk?);
  }
  Ok(buf.freeze())
}

/// Reject keys that could escape a backend's namespace.
pub(crate) fn validate_key(key: &str) -> Result<(), Error> {
  let escapes = key.is_empty()
    || key.starts_with('/')
    || key.contains('\\')
    || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");

  if escapes {
    return Err(Error::InvalidKey(key.to_string()));
  }
  Ok(())
}
