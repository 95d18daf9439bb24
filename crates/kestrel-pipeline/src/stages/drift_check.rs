use kestrel_core::BoxFuture;
use serde_json::json;

use crate::context::{Collaborators, require};
use crate::error::StageError;
use crate::handler::{StageHandler, StageOutput};
use crate::stage::Stage;

/// Runs a drift scan. Drift fails the stage unless `failOnDrift` is false.
pub struct DriftCheck;

impl StageHandler for DriftCheck {
    fn run<'a>(
        &'a self,
        stage: &'a Stage,
        ctx: &'a Collaborators,
    ) -> BoxFuture<'a, Result<StageOutput, StageError>> {
        Box::pin(async move {
            let engine = require(&ctx.drift, "drift engine")?;
            let scan = engine
                .scan()
                .await
                .map_err(|e| StageError::Failed(format!("drift scan failed: {e}")))?;

            let output = json!({
                "scanId": scan.scan_id,
                "totalResources": scan.total_resources,
                "driftedResources": scan.drifted_resources,
                "summary": scan.summary,
            });

            if scan.has_drift() {
                let message = format!(
                    "drift detected in {} of {} resources",
                    scan.drifted_resources, scan.total_resources
                );
                if stage.config_bool("failOnDrift").unwrap_or(true) {
                    return Err(StageError::Failed(message));
                }
                return Ok(StageOutput {
                    output,
                    warnings: vec![message],
                });
            }
            Ok(StageOutput::new(output))
        })
    }
}
