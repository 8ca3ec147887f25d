//! Stratus
//!
//! Core of an asset-graph based cluster installer.
//!
//! - [`asset`]: typed assets and the dependency graph that generates them.
//! - [`graph_store`]: persistence of a resolved graph, sealed with an AEAD,
//!   with the bootstrap payload published in the clear.
//! - [`steps`]: ordered step pipelines with polling conditions and
//!   authorization-refreshing actions.
//! - [`Installer`] ties those together from an [`InstallerConfig`].

mod installer;

pub use installer::{Installer, InstallerError};
pub use stratus_config::InstallerConfig;

pub use stratus_asset as asset;
pub use stratus_blob as blob;
pub use stratus_config as config;
pub use stratus_graph_store as graph_store;
pub use stratus_steps as steps;
