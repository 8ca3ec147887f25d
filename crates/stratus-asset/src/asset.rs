//! The asset contract and its type-erased form.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

use crate::error::{AssetError, BoxError};
use crate::fetch::FileFetcher;

/// A typed unit of derived installation state.
///
/// The `Default` value is the unresolved state. A graph calls [`generate`]
/// at most once per instance of the graph, after every asset returned by
/// [`dependencies`] has been generated.
///
/// [`generate`]: Asset::generate
/// [`dependencies`]: Asset::dependencies
///
/// # Example
///
/// ```ignore
/// #[derive(Default, Serialize, Deserialize)]
/// struct KubeconfigAsset { data: Vec<u8> }
///
/// #[async_trait]
/// impl Asset for KubeconfigAsset {
///   const NAME: &'static str = "kubeconfig";
///
///   fn dependencies(&self) -> Vec<Dependency> {
///     vec![Dependency::on::<RootCa>()]
///   }
///
///   async fn generate(&mut self, parents: &Parents<'_>) -> Result<(), BoxError> {
///     let ca = parents.get::<RootCa>()?;
///     self.data = render_kubeconfig(ca)?;
///     Ok(())
///   }
/// }
/// ```
#[async_trait]
pub trait Asset: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
  /// Stable tag identifying this asset type in graphs and persisted data.
  const NAME: &'static str;

  /// Assets that must be generated before this one.
  fn dependencies(&self) -> Vec<Dependency> {
    Vec::new()
  }

  /// Compute this asset's value from its already generated dependencies.
  async fn generate(&mut self, parents: &Parents<'_>) -> Result<(), BoxError>;

  /// Reconstruct this asset from previously written files.
  ///
  /// Returns `Ok(true)` when the asset was found and loaded, in which case
  /// `generate` is skipped.
  async fn load(&mut self, _files: &dyn FileFetcher) -> Result<bool, BoxError> {
    Ok(false)
  }
}

/// A declared dependency on another asset type.
pub struct Dependency(pub(crate) Box<dyn DynAsset>);

impl Dependency {
  /// Depend on the asset type `T`.
  pub fn on<T: Asset>() -> Self {
    Self(Box::new(T::default()))
  }

  /// Tag of the asset depended upon.
  pub fn name(&self) -> &'static str {
    self.0.name()
  }
}

impl std::fmt::Debug for Dependency {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_tuple("Dependency").field(&self.name()).finish()
  }
}

/// Read-only view of the assets generated so far, handed to
/// [`Asset::generate`].
pub struct Parents<'a> {
  pub(crate) assets: &'a HashMap<&'static str, Box<dyn DynAsset>>,
}

impl Parents<'_> {
  /// Fetch an already generated asset by type.
  pub fn get<T: Asset>(&self) -> Result<&T, AssetError> {
    self
      .assets
      .get(T::NAME)
      .and_then(|asset| asset.as_any().downcast_ref::<T>())
      .ok_or(AssetError::Unresolved(T::NAME))
  }
}

/// Object-safe form of [`Asset`] that the graph stores.
#[async_trait]
pub(crate) trait DynAsset: Send + Sync {
  fn name(&self) -> &'static str;
  fn asset_type(&self) -> TypeId;
  fn type_name(&self) -> &'static str;
  fn dependencies(&self) -> Vec<Dependency>;
  async fn generate(&mut self, parents: &Parents<'_>) -> Result<(), BoxError>;
  async fn load(&mut self, files: &dyn FileFetcher) -> Result<bool, BoxError>;
  fn to_raw(&self) -> Result<Box<RawValue>, serde_json::Error>;
  fn as_any(&self) -> &dyn Any;
  fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[async_trait]
impl<T: Asset> DynAsset for T {
  fn name(&self) -> &'static str {
    T::NAME
  }

  fn asset_type(&self) -> TypeId {
    TypeId::of::<T>()
  }

  fn type_name(&self) -> &'static str {
    std::any::type_name::<T>()
  }

  fn dependencies(&self) -> Vec<Dependency> {
    <T as Asset>::dependencies(self)
  }

  async fn generate(&mut self, parents: &Parents<'_>) -> Result<(), BoxError> {
    <T as Asset>::generate(self, parents).await
  }

  async fn load(&mut self, files: &dyn FileFetcher) -> Result<bool, BoxError> {
    <T as Asset>::load(self, files).await
  }

  fn to_raw(&self) -> Result<Box<RawValue>, serde_json::Error> {
    serde_json::value::to_raw_value(self)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn as_any_mut(&mut self) -> &mut dyn Any {
    self
  }
}
