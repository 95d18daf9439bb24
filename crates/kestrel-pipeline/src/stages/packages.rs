use kestrel_core::BoxFuture;

use super::{joined_errors, validate_all};
use crate::context::{Collaborators, require};
use crate::error::StageError;
use crate::handler::{StageHandler, StageOutput};
use crate::stage::Stage;

fn packages(stage: &Stage) -> Result<Vec<String>, StageError> {
    match stage.config_strings("packages") {
        Some(packages) if !packages.is_empty() => Ok(packages),
        _ => Err(StageError::InvalidConfig(format!(
            "stage {} lists no packages",
            stage.name
        ))),
    }
}

/// Renders and validates every package in `packages`.
pub struct PackageValidation;

impl StageHandler for PackageValidation {
    fn run<'a>(
        &'a self,
        stage: &'a Stage,
        ctx: &'a Collaborators,
    ) -> BoxFuture<'a, Result<StageOutput, StageError>> {
        Box::pin(async move {
            let validator = require(&ctx.package_validator, "package validator")?;
            let packages = packages(stage)?;
            let (output, warnings) = validate_all(validator, &packages, |package, report| {
                format!("package validation failed for {package}: {}", joined_errors(report))
            })
            .await?;
            Ok(StageOutput { output, warnings })
        })
    }
}

/// Checks that every package in `packages` is synced to the clusters.
pub struct PackageSync;

impl StageHandler for PackageSync {
    fn run<'a>(
        &'a self,
        stage: &'a Stage,
        ctx: &'a Collaborators,
    ) -> BoxFuture<'a, Result<StageOutput, StageError>> {
        Box::pin(async move {
            let validator = require(&ctx.sync_validator, "sync validator")?;
            let packages = packages(stage)?;
            let (output, warnings) = validate_all(validator, &packages, |package, report| {
                format!("package sync failed for {package}: {}", joined_errors(report))
            })
            .await?;
            Ok(StageOutput { output, warnings })
        })
    }
}
