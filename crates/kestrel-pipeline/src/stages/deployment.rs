use kestrel_core::BoxFuture;

use super::{joined_errors, target_clusters, validate_all};
use crate::context::{Collaborators, require};
use crate::error::StageError;
use crate::handler::{StageHandler, StageOutput};
use crate::stage::Stage;

/// Validates the deployment on one cluster or all of them. Any
/// unsuccessful cluster fails the stage.
pub struct Deployment;

impl StageHandler for Deployment {
    fn run<'a>(
        &'a self,
        stage: &'a Stage,
        ctx: &'a Collaborators,
    ) -> BoxFuture<'a, Result<StageOutput, StageError>> {
        Box::pin(async move {
            let validator = require(&ctx.cluster_validator, "cluster validator")?;
            let clusters = target_clusters(stage, ctx)?;
            let (output, warnings) = validate_all(validator, &clusters, |cluster, report| {
                format!("deployment failed for cluster {cluster}: {}", joined_errors(report))
            })
            .await?;
            Ok(StageOutput { output, warnings })
        })
    }
}

pub struct HealthCheck;

impl StageHandler for HealthCheck {
    fn run<'a>(
        &'a self,
        stage: &'a Stage,
        ctx: &'a Collaborators,
    ) -> BoxFuture<'a, Result<StageOutput, StageError>> {
        Box::pin(async move {
            let validator = require(&ctx.health_validator, "health validator")?;
            let clusters = target_clusters(stage, ctx)?;
            let (output, warnings) = validate_all(validator, &clusters, |cluster, report| {
                format!("health check failed for {cluster}: {}", joined_errors(report))
            })
            .await?;
            Ok(StageOutput { output, warnings })
        })
    }
}
