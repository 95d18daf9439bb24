//! Built-in stage handlers, one per [`StageType`].

use std::sync::Arc;

use kestrel_core::{ValidationReport, Validator};
use serde_json::{Value, json};

use crate::context::Collaborators;
use crate::error::StageError;
use crate::handler::StageHandler;
use crate::stage::{Stage, StageType};

mod cleanup;
mod deployment;
mod drift_check;
mod git_sync;
mod packages;
mod performance;
mod suite;

pub use cleanup::Cleanup;
pub use deployment::{Deployment, HealthCheck};
pub use drift_check::DriftCheck;
pub use git_sync::GitSync;
pub use packages::{PackageSync, PackageValidation};
pub use performance::PerformanceTest;
pub use suite::E2eTest;

pub(crate) fn builtin(stage_type: StageType) -> Arc<dyn StageHandler> {
    match stage_type {
        StageType::GitSync => Arc::new(GitSync),
        StageType::PackageValidation => Arc::new(PackageValidation),
        StageType::PackageSync => Arc::new(PackageSync),
        StageType::Deployment => Arc::new(Deployment),
        StageType::HealthCheck => Arc::new(HealthCheck),
        StageType::PerformanceTest => Arc::new(PerformanceTest),
        StageType::E2eTest => Arc::new(E2eTest),
        StageType::DriftCheck => Arc::new(DriftCheck),
        StageType::Cleanup => Arc::new(Cleanup),
    }
}

/// Clusters named by the stage (`cluster` or `clusters`), else every
/// configured cluster.
pub(crate) fn target_clusters(
    stage: &Stage,
    ctx: &Collaborators,
) -> Result<Vec<String>, StageError> {
    let named = stage
        .config_strings("clusters")
        .or_else(|| stage.config_strings("cluster"));
    let clusters = named.unwrap_or_else(|| ctx.clusters.clone());
    if clusters.is_empty() {
        return Err(StageError::InvalidConfig(format!(
            "stage {} has no target clusters",
            stage.name
        )));
    }
    Ok(clusters)
}

/// Validate every target and fail on the first unsuccessful report.
///
/// `failure` renders the error message for a failed target. Every report
/// is kept in the output under `reports`.
pub(crate) async fn validate_all(
    validator: &dyn Validator,
    targets: &[String],
    failure: impl Fn(&str, &ValidationReport) -> String,
) -> Result<(Value, Vec<String>), StageError> {
    let mut reports = Vec::with_capacity(targets.len());
    let mut warnings = Vec::new();
    let mut failures = Vec::new();

    for target in targets {
        let report = validator
            .validate(target)
            .await
            .map_err(|e| StageError::collaborator(format!("validating {target}"), e))?;
        tracing::debug!(target = %target, success = report.success, "validated target");
        warnings.extend(report.warnings.iter().map(|w| format!("{target}: {w}")));
        if !report.success {
            failures.push(failure(target, &report));
        }
        reports.push(report);
    }

    if !failures.is_empty() {
        return Err(StageError::Failed(failures.join("; ")));
    }
    Ok((json!({ "reports": reports }), warnings))
}

pub(crate) fn joined_errors(report: &ValidationReport) -> String {
    if report.errors.is_empty() {
        "not ready".to_string()
    } else {
        report.errors.join(", ")
    }
}
