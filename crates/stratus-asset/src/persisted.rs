//! Durable, lazily decoded form of an asset graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::asset::Asset;
use crate::error::AssetError;

/// Serialized asset graph: asset name to that asset's raw JSON.
///
/// Entries stay as unparsed JSON text until a caller asks for them by type,
/// so loading a graph never builds assets nobody requested.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedGraph {
  entries: BTreeMap<String, Box<RawValue>>,
}

impl PersistedGraph {
  pub(crate) fn from_entries(entries: BTreeMap<String, Box<RawValue>>) -> Self {
    Self { entries }
  }

  /// Decode the entry for `T`.
  pub fn get<T: Asset>(&self) -> Result<T, AssetError> {
    let raw = self
      .entries
      .get(T::NAME)
      .ok_or_else(|| AssetError::MissingAsset(T::NAME.to_string()))?;

    serde_json::from_str(raw.get()).map_err(|source| AssetError::Decode {
      asset: T::NAME,
      source,
    })
  }

  /// Decode several entries at once.
  ///
  /// ```ignore
  /// let (config, image): (InstallConfig, ImageRef) = persisted.get_many()?;
  /// ```
  pub fn get_many<S: AssetSet>(&self) -> Result<S, AssetError> {
    S::decode(self)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.entries.contains_key(name)
  }

  /// Raw JSON text of an entry, without decoding it.
  pub fn raw(&self, name: &str) -> Option<&str> {
    self.entries.get(name).map(|raw| raw.get())
  }

  /// Names of every persisted asset, sorted.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// A tuple of asset types that can be decoded together from a
/// [`PersistedGraph`].
pub trait AssetSet: Sized {
  fn decode(graph: &PersistedGraph) -> Result<Self, AssetError>;
}

macro_rules! impl_asset_set {
  ($($t:ident),+) => {
    impl<$($t: Asset),+> AssetSet for ($($t,)+) {
      fn decode(graph: &PersistedGraph) -> Result<Self, AssetError> {
        $(
          if !graph.contains($t::NAME) {
            return Err(AssetError::MissingAsset($t::NAME.to_string()));
          }
        )+
        Ok(($(graph.get::<$t>()?,)+))
      }
    }
  };
}

impl_asset_set!(A);
impl_asset_set!(A, B);
impl_asset_set!(A, B, C);
impl_asset_set!(A, B, C, D);
impl_asset_set!(A, B, C, D, E);
impl_asset_set!(A, B, C, D, E, F);
