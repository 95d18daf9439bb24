use std::sync::Arc;

use kestrel_core::{
    MetricsCollector, PerformanceThresholds, RollbackTrigger, Validator, VersionControl,
};
use kestrel_drift::DriftEngine;

use crate::error::StageError;

/// External collaborators available to stage handlers.
///
/// Every field is optional; a handler that needs a missing collaborator
/// fails with [`StageError::MissingCollaborator`].
#[derive(Clone, Default)]
pub struct Collaborators {
    pub vcs: Option<Arc<dyn VersionControl>>,
    pub package_validator: Option<Arc<dyn Validator>>,
    pub sync_validator: Option<Arc<dyn Validator>>,
    pub cluster_validator: Option<Arc<dyn Validator>>,
    pub health_validator: Option<Arc<dyn Validator>>,
    pub e2e_validator: Option<Arc<dyn Validator>>,
    pub cleanup: Option<Arc<dyn Validator>>,
    pub metrics: Option<Arc<dyn MetricsCollector>>,
    pub drift: Option<Arc<DriftEngine>>,
    pub rollback: Option<Arc<dyn RollbackTrigger>>,
    /// Clusters targeted when a stage does not name its own.
    pub clusters: Vec<String>,
    pub thresholds: PerformanceThresholds,
}

/// Unwrap an optional collaborator or fail the stage.
pub(crate) fn require<'a, T: ?Sized>(
    slot: &'a Option<Arc<T>>,
    name: &'static str,
) -> Result<&'a T, StageError> {
    slot.as_deref().ok_or(StageError::MissingCollaborator(name))
}
