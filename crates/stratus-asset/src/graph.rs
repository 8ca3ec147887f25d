//! In-memory asset graph.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, trace};

use crate::asset::{Asset, DynAsset, Parents};
use crate::error::AssetError;
use crate::fetch::FileFetcher;
use crate::persisted::PersistedGraph;

/// Resolved collection of generated assets, at most one per asset name.
///
/// A graph belongs to a single pipeline run. It is built fresh for each
/// installation phase, populated with [`resolve`](AssetGraph::resolve), optionally
/// customized through [`get_mut`](AssetGraph::get_mut), and then persisted.
#[derive(Default)]
pub struct AssetGraph {
  assets: HashMap<&'static str, Box<dyn DynAsset>>,
  fetcher: Option<Arc<dyn FileFetcher>>,
}

impl AssetGraph {
  /// Create an empty graph.
  pub fn new() -> Self {
    Self::default()
  }

  /// Create an empty graph that tries [`Asset::load`] before generating.
  pub fn with_fetcher(fetcher: Arc<dyn FileFetcher>) -> Self {
    Self {
      assets: HashMap::new(),
      fetcher: Some(fetcher),
    }
  }

  /// Seed the graph with a pre-computed value.
  ///
  /// Later [`resolve`](AssetGraph::resolve) calls use this value instead of
  /// generating `T`. Seeding the same type twice replaces the earlier value.
  pub fn set<T: Asset>(&mut self, value: T) -> Result<&mut Self, AssetError> {
    if let Some(existing) = self.assets.get(T::NAME) {
      ensure_same_type(existing.as_ref(), &value)?;
    }
    self.assets.insert(T::NAME, Box::new(value));
    Ok(self)
  }

  /// Generate `root` and the transitive closure of its dependencies.
  ///
  /// Dependencies are resolved depth first. An asset whose name is already
  /// in the graph is never generated again, which keeps shared dependencies
  /// from being generated once per path that reaches them.
  pub async fn resolve<T: Asset>(&mut self, root: T) -> Result<(), AssetError> {
    let mut in_progress = Vec::new();
    self.resolve_dyn(Box::new(root), &mut in_progress).await
  }

  fn resolve_dyn<'a>(
    &'a mut self,
    mut asset: Box<dyn DynAsset>,
    in_progress: &'a mut Vec<&'static str>,
  ) -> BoxFuture<'a, Result<(), AssetError>> {
    Box::pin(async move {
      let name = asset.name();

      if let Some(existing) = self.assets.get(name) {
        ensure_same_type(existing.as_ref(), asset.as_ref())?;
        trace!(asset = name, "asset already resolved");
        return Ok(());
      }

      if let Some(pos) = in_progress.iter().position(|n| *n == name) {
        let mut path: Vec<&str> = in_progress[pos..].to_vec();
        path.push(name);
        return Err(AssetError::Cycle {
          path: path.join(" -> "),
        });
      }

      in_progress.push(name);
      let result = self.materialize(asset.as_mut(), in_progress).await;
      in_progress.pop();
      result?;

      self.assets.insert(name, asset);
      Ok(())
    })
  }

  /// Resolve an asset's dependencies, then load or generate the asset itself.
  async fn materialize(
    &mut self,
    asset: &mut dyn DynAsset,
    in_progress: &mut Vec<&'static str>,
  ) -> Result<(), AssetError> {
    for dependency in asset.dependencies() {
      self.resolve_dyn(dependency.0, in_progress).await?;
    }

    let name = asset.name();

    if let Some(fetcher) = &self.fetcher {
      let found = asset
        .load(fetcher.as_ref())
        .await
        .map_err(|source| AssetError::Load { asset: name, source })?;
      if found {
        debug!(asset = name, "asset loaded from files");
        return Ok(());
      }
    }

    let parents = Parents {
      assets: &self.assets,
    };
    asset
      .generate(&parents)
      .await
      .map_err(|source| AssetError::Generate { asset: name, source })?;

    debug!(asset = name, "asset generated");
    Ok(())
  }

  /// Typed access to a generated asset.
  ///
  /// # Panics
  /// Panics if `T` has not been resolved or seeded. Asking for an asset
  /// before resolving it is a programming error.
  pub fn get<T: Asset>(&self) -> &T {
    match self.try_get::<T>() {
      Some(asset) => asset,
      None => panic!("asset '{}' requested before it was resolved", T::NAME),
    }
  }

  /// Typed access to a generated asset, `None` if it is not in the graph.
  pub fn try_get<T: Asset>(&self) -> Option<&T> {
    self
      .assets
      .get(T::NAME)
      .and_then(|asset| asset.as_any().downcast_ref::<T>())
  }

  /// Mutable access for customization before persisting.
  pub fn get_mut<T: Asset>(&mut self) -> Option<&mut T> {
    self
      .assets
      .get_mut(T::NAME)
      .and_then(|asset| asset.as_any_mut().downcast_mut::<T>())
  }

  pub fn contains<T: Asset>(&self) -> bool {
    self.try_get::<T>().is_some()
  }

  pub fn len(&self) -> usize {
    self.assets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.assets.is_empty()
  }

  /// Names of every asset in the graph, sorted.
  pub fn names(&self) -> Vec<&'static str> {
    let mut names: Vec<_> = self.assets.keys().copied().collect();
    names.sort_unstable();
    names
  }

  /// Serialize every asset into its persisted form.
  pub fn to_persisted(&self) -> Result<PersistedGraph, AssetError> {
    let mut entries = BTreeMap::new();
    for (&name, asset) in &self.assets {
      let raw = asset
        .to_raw()
        .map_err(|source| AssetError::Encode { asset: name, source })?;
      entries.insert(name.to_string(), raw);
    }
    Ok(PersistedGraph::from_entries(entries))
  }
}

fn ensure_same_type(existing: &dyn DynAsset, incoming: &dyn DynAsset) -> Result<(), AssetError> {
  if existing.asset_type() != incoming.asset_type() {
    return Err(AssetError::NameCollision {
      name: existing.name(),
      existing: existing.type_name(),
      incoming: incoming.type_name(),
    });
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{BoxError, Dependency};
  use serde::{Deserialize, Serialize};

  #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
  struct ClusterName(String);

  #[async_trait::async_trait]
  impl Asset for ClusterName {
    const NAME: &'static str = "cluster-name";

    async fn generate(&mut self, _parents: &Parents<'_>) -> Result<(), BoxError> {
      self.0 = "generated".to_string();
      Ok(())
    }
  }

  #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
  struct Domain(String);

  #[async_trait::async_trait]
  impl Asset for Domain {
    const NAME: &'static str = "domain";

    fn dependencies(&self) -> Vec<Dependency> {
      vec![Dependency::on::<ClusterName>()]
    }

    async fn generate(&mut self, parents: &Parents<'_>) -> Result<(), BoxError> {
      let name = parents.get::<ClusterName>()?;
      self.0 = format!("{}.example.com", name.0);
      Ok(())
    }
  }

  #[derive(Debug, Default, Serialize, Deserialize)]
  struct Impostor;

  #[async_trait::async_trait]
  impl Asset for Impostor {
    const NAME: &'static str = "domain";

    async fn generate(&mut self, _parents: &Parents<'_>) -> Result<(), BoxError> {
      Ok(())
    }
  }

  #[tokio::test]
  async fn test_resolve_generates_dependencies_first() {
    let mut graph = AssetGraph::new();
    graph.resolve(Domain::default()).await.unwrap();

    assert_eq!(graph.get::<ClusterName>().0, "generated");
    assert_eq!(graph.get::<Domain>().0, "generated.example.com");
    assert_eq!(graph.names(), vec!["cluster-name", "domain"]);
  }

  #[tokio::test]
  async fn test_seeded_value_skips_generation() {
    let mut graph = AssetGraph::new();
    graph.set(ClusterName("seeded".to_string())).unwrap();
    graph.resolve(Domain::default()).await.unwrap();

    assert_eq!(graph.get::<ClusterName>().0, "seeded");
    assert_eq!(graph.get::<Domain>().0, "seeded.example.com");
  }

  #[test]
  fn test_name_collision_is_rejected() {
    let mut graph = AssetGraph::new();
    graph.set(Domain("a".to_string())).unwrap();
    let err = graph.set(Impostor).err().unwrap();
    assert!(matches!(err, AssetError::NameCollision { name: "domain", .. }));
  }

  #[test]
  fn test_get_mut_allows_customization() {
    let mut graph = AssetGraph::new();
    graph.set(ClusterName("before".to_string())).unwrap();
    graph.get_mut::<ClusterName>().unwrap().0 = "after".to_string();
    assert_eq!(graph.get::<ClusterName>().0, "after");
    assert!(graph.get_mut::<Domain>().is_none());
  }

  #[test]
  #[should_panic(expected = "asset 'domain' requested before it was resolved")]
  fn test_get_unresolved_panics() {
    let graph = AssetGraph::new();
    graph.get::<Domain>();
  }
}
