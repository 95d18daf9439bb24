use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use jiff::Timestamp;
use kestrel_core::ValidationReport;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::config::PipelineConfig;
use crate::context::Collaborators;
use crate::error::PipelineError;
use crate::executor::StageExecutor;
use crate::handler::{HandlerRegistry, StageHandler};
use crate::result::{PipelineMetrics, PipelineResult, PipelineSummary, StageResult};
use crate::schedule::{group_parallel, ready_set, validate_stages};
use crate::stage::{FailureStrategy, Stage, StageType};

/// Runs a declared pipeline of stages against a set of collaborators.
pub struct StageOrchestrator {
    config: PipelineConfig,
    registry: HandlerRegistry,
    collaborators: Arc<Collaborators>,
}

/// Why the scheduler stopped before every stage ran.
struct Halt {
    stage: String,
    errors: Vec<String>,
}

impl StageOrchestrator {
    pub fn new(config: PipelineConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            registry: HandlerRegistry::builtin(),
            collaborators: Arc::new(collaborators),
        }
    }

    /// Replace the handler for one stage type.
    pub fn with_handler(
        mut self,
        stage_type: StageType,
        handler: Arc<dyn StageHandler>,
    ) -> Self {
        self.registry.register(stage_type, handler);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute every stage in dependency order.
    ///
    /// `Err` only for a disabled pipeline. An invalid stage graph yields a
    /// failed result in which no stage ran; stage failures are reported in
    /// the returned result.
    pub async fn run(&self) -> Result<PipelineResult, PipelineError> {
        if !self.config.enabled {
            return Err(PipelineError::Disabled);
        }

        let pipeline_id = kestrel_core::id::run_id("e2e");
        let start_time = Timestamp::now();
        if let Err(e) = validate_stages(&self.config.stages) {
            return Ok(self.rejected(pipeline_id, start_time, e));
        }
        let started = Instant::now();
        let deadline = self.config.max_duration.map(|d| started + d);
        tracing::info!(
            pipeline_id = %pipeline_id,
            stages = self.config.stages.len(),
            strategy = ?self.config.failure_strategy,
            "pipeline started"
        );

        let executor = StageExecutor::new(
            Arc::new(self.registry.clone()),
            self.collaborators.clone(),
            self.config.retry_delay,
            deadline,
        );
        let results: Arc<Mutex<Vec<StageResult>>> = Arc::new(Mutex::new(Vec::new()));

        let mut executed: HashSet<&str> = HashSet::new();
        // Hard-failed stages and everything downstream of them.
        let mut blocked: HashSet<&str> = HashSet::new();
        let mut skip_reasons: HashMap<&str, String> = HashMap::new();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut halt: Option<Halt> = None;

        'schedule: loop {
            let pending: Vec<&Stage> = self
                .config
                .stages
                .iter()
                .filter(|s| {
                    let name = s.name.as_str();
                    !executed.contains(name) && !blocked.contains(name)
                })
                .collect();
            if pending.is_empty() {
                break;
            }

            // Retire dependents of blocked stages before scheduling, so the
            // blocked set is closed under dependency.
            let mut blocked_any = false;
            for &stage in &pending {
                if let Some(dependency) = stage
                    .dependencies
                    .iter()
                    .find(|d| blocked.contains(d.as_str()))
                {
                    blocked.insert(stage.name.as_str());
                    skip_reasons.insert(
                        stage.name.as_str(),
                        format!("skipped: dependency {dependency} did not succeed"),
                    );
                    blocked_any = true;
                }
            }
            if blocked_any {
                continue;
            }

            let ready = ready_set(&pending, &executed);
            if ready.is_empty() {
                let stages = pending.iter().map(|s| s.name.clone()).collect();
                errors.push(PipelineError::CircularDependency { stages }.to_string());
                break;
            }

            for group in group_parallel(&ready) {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    errors.push("pipeline exceeded its maximum duration".to_string());
                    break 'schedule;
                }

                let finished = self.run_group(&executor, &group, &results).await;

                for (&stage, result) in group.iter().zip(finished) {
                    if result.success {
                        executed.insert(stage.name.as_str());
                        continue;
                    }
                    if stage.continue_on_failure {
                        warnings.push(format!(
                            "stage {} failed and was allowed to fail",
                            stage.name
                        ));
                        executed.insert(stage.name.as_str());
                        continue;
                    }

                    errors.push(format!(
                        "stage {} failed: {}",
                        stage.name,
                        result.errors.join("; ")
                    ));
                    blocked.insert(stage.name.as_str());

                    match self.config.failure_strategy {
                        FailureStrategy::Continue => {
                            tracing::warn!(stage = %stage.name, "stage failed, continuing");
                        }
                        FailureStrategy::Stop | FailureStrategy::Rollback => {
                            if halt.is_none() {
                                tracing::warn!(
                                    stage = %stage.name,
                                    "stage failed, halting pipeline"
                                );
                                halt = Some(Halt {
                                    stage: stage.name.clone(),
                                    errors: result.errors.clone(),
                                });
                            }
                        }
                    }
                }
                if halt.is_some() {
                    break 'schedule;
                }
            }
        }

        let mut stage_results = std::mem::take(&mut *results.lock().await);
        for stage in &self.config.stages {
            if stage_results.iter().any(|r| r.stage == stage.name) {
                continue;
            }
            let reason = match skip_reasons.get(stage.name.as_str()) {
                Some(reason) => reason.clone(),
                None if halt.is_some() => "skipped: pipeline halted".to_string(),
                None => "skipped: pipeline did not reach this stage".to_string(),
            };
            stage_results.push(StageResult::skipped(stage, reason));
        }

        let rollback = match (&halt, self.config.failure_strategy) {
            (Some(halt), FailureStrategy::Rollback) => {
                self.request_rollback(halt, &mut errors, &mut warnings).await
            }
            _ => None,
        };

        let metrics = self.final_metrics(&mut warnings).await;

        let allowed_to_fail = |r: &StageResult| {
            self.config
                .stages
                .iter()
                .any(|s| s.name == r.stage && s.continue_on_failure)
        };
        let success = errors.is_empty()
            && stage_results
                .iter()
                .all(|r| r.success || (r.failed() && allowed_to_fail(r)));
        let summary = PipelineSummary::from_results(&stage_results, metrics.as_ref(), success);

        let duration = started.elapsed();
        tracing::info!(
            pipeline_id = %pipeline_id,
            success,
            successful = summary.successful_stages,
            failed = summary.failed_stages,
            skipped = summary.skipped_stages,
            dod = summary.dod_compliance.overall,
            duration_ms = duration.as_millis() as u64,
            "pipeline finished"
        );

        Ok(PipelineResult {
            pipeline_id,
            start_time,
            end_time: Timestamp::now(),
            duration,
            success,
            stage_results,
            metrics,
            errors,
            warnings,
            summary,
            rollback,
        })
    }

    /// Result for a stage graph that cannot be scheduled.
    fn rejected(
        &self,
        pipeline_id: String,
        start_time: Timestamp,
        err: PipelineError,
    ) -> PipelineResult {
        tracing::warn!(pipeline_id = %pipeline_id, error = %err, "pipeline rejected");
        let stage_results: Vec<StageResult> = self
            .config
            .stages
            .iter()
            .map(|stage| StageResult::skipped(stage, "skipped: invalid stage graph"))
            .collect();
        let summary = PipelineSummary::from_results(&stage_results, None, false);
        PipelineResult {
            pipeline_id,
            start_time,
            end_time: Timestamp::now(),
            duration: std::time::Duration::ZERO,
            success: false,
            stage_results,
            metrics: None,
            errors: vec![err.to_string()],
            warnings: Vec::new(),
            summary,
            rollback: None,
        }
    }

    /// Run one group and return its results in group order.
    ///
    /// A single stage runs inline; larger groups run as a task set that is
    /// fully joined before returning.
    async fn run_group(
        &self,
        executor: &StageExecutor,
        group: &[&Stage],
        results: &Arc<Mutex<Vec<StageResult>>>,
    ) -> Vec<StageResult> {
        if let [stage] = group {
            let result = executor.execute(stage).await;
            results.lock().await.push(result.clone());
            return vec![result];
        }

        tracing::info!(
            stages = ?group.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            "running parallel group"
        );
        let mut tasks = JoinSet::new();
        for stage in group {
            let executor = executor.clone();
            let stage = (*stage).clone();
            let results = results.clone();
            tasks.spawn(async move {
                let result = executor.execute(&stage).await;
                results.lock().await.push(result);
            });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "stage task aborted");
            }
        }

        let mut recorded = results.lock().await;
        group
            .iter()
            .map(|stage| {
                if let Some(result) = recorded.iter().find(|r| r.stage == stage.name) {
                    return result.clone();
                }
                let aborted = StageResult::aborted(stage, "stage task aborted");
                recorded.push(aborted.clone());
                aborted
            })
            .collect()
    }

    async fn request_rollback(
        &self,
        halt: &Halt,
        errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) -> Option<kestrel_core::RollbackOutcome> {
        let Some(trigger) = &self.collaborators.rollback else {
            warnings.push(
                "rollback strategy selected but no rollback trigger is configured".into(),
            );
            return None;
        };

        let report = ValidationReport::failed(halt.stage.clone(), halt.errors.clone());
        match trigger.on_validation_failure(&report).await {
            Ok(Some(outcome)) => {
                tracing::info!(
                    rollback_id = %outcome.rollback_id,
                    status = %outcome.status,
                    "pipeline rollback finished"
                );
                if !outcome.errors.is_empty() {
                    errors.push(format!(
                        "rollback {} {}: {}",
                        outcome.rollback_id,
                        outcome.status,
                        outcome.errors.join("; ")
                    ));
                }
                Some(outcome)
            }
            Ok(None) => {
                warnings.push(format!(
                    "stage {} failure did not meet the rollback policy",
                    halt.stage
                ));
                None
            }
            Err(e) => {
                errors.push(format!("rollback request failed: {e}"));
                None
            }
        }
    }

    /// Metrics from the first configured cluster that answers.
    async fn final_metrics(&self, warnings: &mut Vec<String>) -> Option<PipelineMetrics> {
        let collector = self.collaborators.metrics.as_ref()?;
        for cluster in &self.collaborators.clusters {
            match collector.collect(cluster).await {
                Ok(sample) => {
                    let violations = self.collaborators.thresholds.violations(&sample);
                    return Some(PipelineMetrics {
                        baseline_cluster: cluster.clone(),
                        sample,
                        within_thresholds: violations.is_empty(),
                        violations,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        cluster = %cluster,
                        error = %e,
                        "failed to collect final metrics"
                    );
                }
            }
        }
        warnings.push("no cluster returned final metrics".into());
        None
    }
}
