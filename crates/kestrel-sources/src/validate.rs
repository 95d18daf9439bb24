use std::path::PathBuf;
use std::sync::Arc;

use kestrel_core::resource;
use kestrel_core::{BoxFuture, ClusterState, CoreError, ValidationReport, Validator};
use serde_json::json;

use crate::fs::scan_tree;

/// Ready when every `Deployment` has as many ready replicas as it asks for.
///
/// The target names the cluster in the report only; every deployment the
/// wrapped cluster serves is checked.
pub struct ReadinessValidator {
    cluster: Arc<dyn ClusterState>,
}

impl ReadinessValidator {
    pub fn new(cluster: Arc<dyn ClusterState>) -> Self {
        Self { cluster }
    }
}

impl Validator for ReadinessValidator {
    fn validate<'a>(
        &'a self,
        target: &'a str,
    ) -> BoxFuture<'a, Result<ValidationReport, CoreError>> {
        Box::pin(async move {
            let kinds = self.cluster.list_kinds().await?;
            let mut checked = 0;
            let mut errors = Vec::new();

            for kind in kinds.iter().filter(|k| k.kind == "Deployment") {
                for deployment in self.cluster.list(kind, None).await? {
                    checked += 1;
                    let desired = deployment
                        .pointer("/spec/replicas")
                        .and_then(|v| v.as_u64())
                        .unwrap_or(1);
                    let ready = deployment
                        .pointer("/status/readyReplicas")
                        .and_then(|v| v.as_u64())
                        .unwrap_or(0);
                    if ready < desired {
                        let name = resource::name(&deployment).unwrap_or_default();
                        errors.push(format!(
                            "deployment {name}: {ready}/{desired} replicas ready"
                        ));
                    }
                }
            }

            let mut report = if errors.is_empty() {
                ValidationReport::passed(target)
            } else {
                ValidationReport::failed(target, errors)
            };
            if checked == 0 {
                report.warnings.push("no deployments found".into());
            }
            report.details = json!({ "deployments": checked });
            Ok(report)
        })
    }
}

/// Renders a package directory under `root` and checks every document
/// carries a name.
pub struct PackageValidator {
    root: PathBuf,
}

impl PackageValidator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Validator for PackageValidator {
    fn validate<'a>(
        &'a self,
        target: &'a str,
    ) -> BoxFuture<'a, Result<ValidationReport, CoreError>> {
        Box::pin(async move {
            let dir = self.root.join(target);
            if !dir.is_dir() {
                return Ok(ValidationReport::failed(
                    target,
                    vec![format!("package directory {target} not found")],
                ));
            }

            let resources = tokio::task::spawn_blocking(move || scan_tree(&dir))
                .await
                .map_err(|e| {
                    CoreError::Validation(format!("package render task failed: {e}"))
                })??;

            let mut errors: Vec<String> = resources
                .iter()
                .filter(|r| r.id.name.is_empty())
                .map(|r| {
                    format!(
                        "{} in {} has no metadata.name",
                        r.id.kind,
                        r.id.source_file.as_deref().unwrap_or("?")
                    )
                })
                .collect();
            if resources.is_empty() {
                errors.push(format!("package {target} renders no resources"));
            }

            let mut report = if errors.is_empty() {
                ValidationReport::passed(target)
            } else {
                ValidationReport::failed(target, errors)
            };
            report.details = json!({ "resources": resources.len() });
            Ok(report)
        })
    }
}

/// Synced when every resource a package declares exists on the cluster.
pub struct SyncValidator {
    root: PathBuf,
    cluster: Arc<dyn ClusterState>,
}

impl SyncValidator {
    pub fn new(root: impl Into<PathBuf>, cluster: Arc<dyn ClusterState>) -> Self {
        Self {
            root: root.into(),
            cluster,
        }
    }
}

impl Validator for SyncValidator {
    fn validate<'a>(
        &'a self,
        target: &'a str,
    ) -> BoxFuture<'a, Result<ValidationReport, CoreError>> {
        Box::pin(async move {
            let dir = self.root.join(target);
            let declared = tokio::task::spawn_blocking(move || scan_tree(&dir))
                .await
                .map_err(|e| {
                    CoreError::Validation(format!("package read task failed: {e}"))
                })??;

            let mut missing = Vec::new();
            for resource in &declared {
                if self.cluster.get(&resource.id).await?.is_none() {
                    missing.push(format!("{} not synced", resource.id));
                }
            }

            let mut report = if missing.is_empty() {
                ValidationReport::passed(target)
            } else {
                ValidationReport::failed(target, missing)
            };
            report.details = json!({ "resources": declared.len() });
            Ok(report)
        })
    }
}
