use kestrel_core::BoxFuture;

use super::target_clusters;
use crate::context::{Collaborators, require};
use crate::error::StageError;
use crate::handler::{StageHandler, StageOutput};
use crate::stage::Stage;

/// Collects metrics for each target cluster and checks them against the
/// configured thresholds.
pub struct PerformanceTest;

impl StageHandler for PerformanceTest {
    fn run<'a>(
        &'a self,
        stage: &'a Stage,
        ctx: &'a Collaborators,
    ) -> BoxFuture<'a, Result<StageOutput, StageError>> {
        Box::pin(async move {
            let collector = require(&ctx.metrics, "metrics collector")?;
            let clusters = target_clusters(stage, ctx)?;

            let mut samples = Vec::with_capacity(clusters.len());
            let mut failures = Vec::new();
            for cluster in &clusters {
                let sample = collector.collect(cluster).await.map_err(|e| {
                    StageError::collaborator(format!("collecting metrics for {cluster}"), e)
                })?;
                let violations = ctx.thresholds.violations(&sample);
                if !violations.is_empty() {
                    tracing::warn!(
                        cluster = %cluster,
                        violations = violations.len(),
                        "performance thresholds breached"
                    );
                    failures.push(format!(
                        "performance threshold exceeded on {cluster}: {}",
                        violations.join(", ")
                    ));
                }
                samples.push(sample);
            }

            if !failures.is_empty() {
                return Err(StageError::Failed(failures.join("; ")));
            }
            Ok(StageOutput::new(serde_json::json!({ "samples": samples })))
        })
    }
}
