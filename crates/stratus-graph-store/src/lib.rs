//! Stratus Graph Store
//!
//! Persists resolved [`AssetGraph`](stratus_asset::AssetGraph)s to blob
//! storage and loads them back.
//!
//! Per cluster scope two blobs are written:
//!
//! ```text
//! {resource_group}/{account}/
//! ├── ignition/bootstrap.ign   bootstrap payload, unencrypted
//! └── aro/graph                AEAD-sealed JSON of every asset
//! ```
//!
//! The bootstrap payload is split out because a booting machine downloads it
//! before any credentials exist. Everything else may hold secrets and is only
//! ever written sealed.

mod aead;
mod error;
mod manager;

pub use aead::{Aead, AeadError, AesGcmAead};
pub use error::GraphStoreError;
pub use manager::{BootstrapAsset, Manager, Scope};
