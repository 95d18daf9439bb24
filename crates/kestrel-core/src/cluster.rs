use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::BoxFuture;
use crate::error::CoreError;
use crate::resource::ResourceIdentifier;

/// A resource kind served by the cluster API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindInfo {
    pub api_version: String,
    pub kind: String,
    pub namespaced: bool,
}

/// Reads and mutates live resources.
///
/// Every call may block on the cluster API; callers bound them with a
/// deadline and cancel by dropping the returned future.
pub trait ClusterState: Send + Sync {
    /// All kinds the cluster serves. Callers filter to the kinds they monitor.
    fn list_kinds(&self) -> BoxFuture<'_, Result<Vec<KindInfo>, CoreError>>;

    /// List live resources of one kind. `None` lists across all namespaces.
    fn list<'a>(
        &'a self,
        kind: &'a KindInfo,
        namespace: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<Value>, CoreError>>;

    /// Read one resource. `None` = doesn't exist.
    fn get<'a>(
        &'a self,
        id: &'a ResourceIdentifier,
    ) -> BoxFuture<'a, Result<Option<Value>, CoreError>>;

    fn create<'a>(&'a self, resource: &'a Value) -> BoxFuture<'a, Result<(), CoreError>>;

    fn update<'a>(&'a self, resource: &'a Value) -> BoxFuture<'a, Result<(), CoreError>>;

    fn delete<'a>(&'a self, id: &'a ResourceIdentifier) -> BoxFuture<'a, Result<(), CoreError>>;
}
