use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use kestrel_core::{
    BoxFuture, ClusterState, CoreError, KindInfo, ResourceIdentifier, ResourceKey,
};
use serde_json::Value;

use crate::fs::scan_tree;

/// Live resources held in memory.
///
/// Serves kinds derived from the stored resources plus any registered with
/// [`MemoryCluster::with_kind`]. Writes replace whole documents.
#[derive(Debug, Default)]
pub struct MemoryCluster {
    resources: RwLock<BTreeMap<ResourceKey, Value>>,
    extra_kinds: Vec<KindInfo>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from documents; ones without `apiVersion`/`kind` are dropped.
    pub fn from_documents(docs: impl IntoIterator<Item = Value>) -> Self {
        let cluster = Self::new();
        {
            let mut resources = cluster.write();
            for doc in docs {
                if let Some(id) = ResourceIdentifier::from_document(&doc) {
                    resources.insert(id.key(), doc);
                }
            }
        }
        cluster
    }

    /// Load a snapshot directory of exported YAML resources.
    pub fn load_dir(dir: &Path) -> Result<Self, CoreError> {
        let docs = scan_tree(dir)?.into_iter().map(|declared| declared.content);
        let cluster = Self::from_documents(docs);
        tracing::info!(dir = %dir.display(), resources = cluster.len(), "loaded cluster snapshot");
        Ok(cluster)
    }

    /// Serve `kind` even while no resource of it exists.
    pub fn with_kind(mut self, kind: KindInfo) -> Self {
        self.extra_kinds.push(kind);
        self
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Every stored document, ordered by resource key.
    pub fn snapshot(&self) -> Vec<Value> {
        self.read().values().cloned().collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<ResourceKey, Value>> {
        match self.resources.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<ResourceKey, Value>> {
        match self.resources.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn kinds(&self) -> Vec<KindInfo> {
        let mut kinds: BTreeMap<(String, String), bool> = BTreeMap::new();
        for key in self.read().keys() {
            let namespaced = kinds
                .entry((key.api_version.clone(), key.kind.clone()))
                .or_default();
            *namespaced |= !key.namespace.is_empty();
        }
        for extra in &self.extra_kinds {
            kinds
                .entry((extra.api_version.clone(), extra.kind.clone()))
                .or_insert(extra.namespaced);
        }
        kinds
            .into_iter()
            .map(|((api_version, kind), namespaced)| KindInfo {
                api_version,
                kind,
                namespaced,
            })
            .collect()
    }
}

fn identify(resource: &Value) -> Result<ResourceIdentifier, CoreError> {
    ResourceIdentifier::from_document(resource)
        .ok_or_else(|| CoreError::Cluster("resource has no apiVersion/kind".into()))
}

impl ClusterState for MemoryCluster {
    fn list_kinds(&self) -> BoxFuture<'_, Result<Vec<KindInfo>, CoreError>> {
        Box::pin(async move { Ok(self.kinds()) })
    }

    fn list<'a>(
        &'a self,
        kind: &'a KindInfo,
        namespace: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<Value>, CoreError>> {
        Box::pin(async move {
            Ok(self
                .read()
                .iter()
                .filter(|(key, _)| key.api_version == kind.api_version && key.kind == kind.kind)
                .filter(|(key, _)| namespace.is_none_or(|ns| key.namespace == ns))
                .map(|(_, doc)| doc.clone())
                .collect())
        })
    }

    fn get<'a>(
        &'a self,
        id: &'a ResourceIdentifier,
    ) -> BoxFuture<'a, Result<Option<Value>, CoreError>> {
        Box::pin(async move { Ok(self.read().get(&id.key()).cloned()) })
    }

    fn create<'a>(&'a self, resource: &'a Value) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move {
            let id = identify(resource)?;
            let mut resources = self.write();
            if resources.contains_key(&id.key()) {
                return Err(CoreError::AlreadyExists(id.to_string()));
            }
            resources.insert(id.key(), resource.clone());
            Ok(())
        })
    }

    fn update<'a>(&'a self, resource: &'a Value) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move {
            let id = identify(resource)?;
            let mut resources = self.write();
            match resources.get_mut(&id.key()) {
                Some(existing) => {
                    *existing = resource.clone();
                    Ok(())
                }
                None => Err(CoreError::NotFound(id.to_string())),
            }
        })
    }

    fn delete<'a>(&'a self, id: &'a ResourceIdentifier) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move {
            match self.write().remove(&id.key()) {
                Some(_) => Ok(()),
                None => Err(CoreError::NotFound(id.to_string())),
            }
        })
    }
}
