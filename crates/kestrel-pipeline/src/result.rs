use std::time::Duration;

use jiff::Timestamp;
use kestrel_core::{MetricsSample, RollbackOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::stage::{Stage, StageType};

/// Outcome of one stage, including every retry it took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    pub stage: String,
    pub stage_type: StageType,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    #[serde(with = "kestrel_core::duration")]
    pub duration: Duration,
    pub success: bool,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Retries performed, i.e. the index of the last attempt.
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub output: Value,
}

impl StageResult {
    /// A stage that never ran.
    pub fn skipped(stage: &Stage, reason: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            stage: stage.name.clone(),
            stage_type: stage.stage_type,
            start_time: now,
            end_time: now,
            duration: Duration::ZERO,
            success: false,
            skipped: true,
            errors: Vec::new(),
            warnings: vec![reason.into()],
            retry_count: 0,
            output: Value::Null,
        }
    }

    /// A stage whose task ended without reporting a result.
    pub fn aborted(stage: &Stage, error: impl Into<String>) -> Self {
        Self {
            skipped: false,
            warnings: Vec::new(),
            errors: vec![error.into()],
            ..Self::skipped(stage, "")
        }
    }

    pub fn failed(&self) -> bool {
        !self.success && !self.skipped
    }
}

/// Final metrics, taken from the first cluster that answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetrics {
    pub baseline_cluster: String,
    pub sample: MetricsSample,
    pub within_thresholds: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<String>,
}

/// Definition of Done: four flags ANDed into `overall`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DodCompliance {
    pub all_tests_green: bool,
    pub metrics_within_thresholds: bool,
    pub gitops_packages_rendered: bool,
    pub kubectl_resources_ready: bool,
    pub overall: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub total_stages: usize,
    pub successful_stages: usize,
    pub failed_stages: usize,
    pub skipped_stages: usize,
    pub dod_compliance: DodCompliance,
}

impl PipelineSummary {
    /// Tally `results` and derive compliance. `success` is the pipeline's
    /// own verdict, which already tolerates stages allowed to fail.
    pub fn from_results(
        results: &[StageResult],
        metrics: Option<&PipelineMetrics>,
        success: bool,
    ) -> Self {
        let total_stages = results.len();
        let successful_stages = results.iter().filter(|r| r.success).count();
        let failed_stages = results.iter().filter(|r| r.failed()).count();
        let skipped_stages = total_stages - successful_stages - failed_stages;

        let succeeded = |stage_type: StageType| {
            results
                .iter()
                .any(|r| r.stage_type == stage_type && r.success)
        };

        let all_tests_green = total_stages > 0 && success;
        let metrics_within_thresholds = metrics.is_some_and(|m| m.within_thresholds);
        let gitops_packages_rendered = succeeded(StageType::PackageValidation);
        let kubectl_resources_ready = succeeded(StageType::Deployment);

        Self {
            total_stages,
            successful_stages,
            failed_stages,
            skipped_stages,
            dod_compliance: DodCompliance {
                all_tests_green,
                metrics_within_thresholds,
                gitops_packages_rendered,
                kubectl_resources_ready,
                overall: all_tests_green
                    && metrics_within_thresholds
                    && gitops_packages_rendered
                    && kubectl_resources_ready,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub pipeline_id: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    #[serde(with = "kestrel_core::duration")]
    pub duration: Duration,
    pub success: bool,
    pub stage_results: Vec<StageResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<PipelineMetrics>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub summary: PipelineSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<RollbackOutcome>,
}

impl PipelineResult {
    pub fn stage(&self, name: &str) -> Option<&StageResult> {
        self.stage_results.iter().find(|r| r.stage == name)
    }
}
