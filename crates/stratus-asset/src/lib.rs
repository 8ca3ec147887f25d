//! Stratus Asset
//!
//! This crate provides the asset dependency graph for stratus. An asset is a
//! typed, dependency-declaring unit of derived installation state (install
//! config, keys, boot payloads, templates). Assets are identified by a stable
//! string tag, [`Asset::NAME`], so that the persisted form never depends on
//! Rust type layout.
//!
//! # Architecture
//!
//! ```text
//! AssetGraph
//! ├── set(value)        - seed a pre-computed asset
//! ├── resolve(root)     - depth-first generate root and its closure, once per tag
//! ├── get::<T>()        - typed access to a generated asset
//! └── to_persisted()    - tag -> raw JSON, ready to be sealed and stored
//!
//! PersistedGraph
//! ├── get::<T>()        - decode exactly one entry
//! └── get_many::<(A, B)>() - decode a tuple of entries
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut graph = AssetGraph::new();
//! graph.set(install_config)?;
//! graph.resolve(Templates::default()).await?;
//!
//! let templates = graph.get::<Templates>();
//! let persisted = graph.to_persisted()?;
//! ```

mod asset;
mod error;
mod fetch;
mod graph;
mod persisted;

pub use asset::{Asset, Dependency, Parents};
pub use error::{AssetError, BoxError};
pub use fetch::{AssetFile, DirFetcher, FileFetcher};
pub use graph::AssetGraph;
pub use persisted::{AssetSet, PersistedGraph};
