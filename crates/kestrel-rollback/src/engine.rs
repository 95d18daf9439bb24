use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use jiff::Timestamp;
use tracing::Instrument;

use kestrel_core::{
    BoxFuture, ClusterState, Commit, CoreError, RollbackOutcome, RollbackTrigger,
    ValidationReport, Validator, VersionControl, format_err_chain, id,
};

use crate::audit::RollbackAuditEvent;
use crate::config::RollbackConfig;
use crate::error::RollbackError;
use crate::history::{HistoryPersistence, RollbackHistory};
use crate::plan::{order_for_execution, plan_rollback};
use crate::policy::{self, STABLE_HISTORY_WINDOW};
use crate::state::{ResourceStatus, RollbackAction, RollbackResource, RollbackState, RollbackStatus};

/// Computes and executes rollbacks to a historical revision.
///
/// At most one rollback runs at a time per engine; a second request while
/// one is in flight is cancelled rather than queued.
pub struct RollbackEngine {
    config: RollbackConfig,
    vcs: Arc<dyn VersionControl>,
    cluster: Arc<dyn ClusterState>,
    validator: Option<Arc<dyn Validator>>,
    history: Mutex<RollbackHistory>,
    persistence: Option<HistoryPersistence>,
    in_flight: tokio::sync::Mutex<()>,
}

impl RollbackEngine {
    pub fn new(
        config: RollbackConfig,
        vcs: Arc<dyn VersionControl>,
        cluster: Arc<dyn ClusterState>,
    ) -> Self {
        let persistence = config.history_path.clone().map(HistoryPersistence::new);
        Self {
            config,
            vcs,
            cluster,
            validator: None,
            history: Mutex::new(RollbackHistory::default()),
            persistence,
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    /// Validator re-run after resources are rolled back.
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Seed history, e.g. from [`HistoryPersistence::load`].
    pub fn with_history(self, history: RollbackHistory) -> Self {
        *self.lock_history() = history;
        self
    }

    /// Load history from the configured file, if any.
    pub fn restore_history(self) -> Result<Self, RollbackError> {
        let history = match &self.persistence {
            Some(persistence) => Some(persistence.load()?),
            None => None,
        };
        Ok(match history {
            Some(history) => self.with_history(history),
            None => self,
        })
    }

    pub fn config(&self) -> &RollbackConfig {
        &self.config
    }

    pub fn history(&self) -> RollbackHistory {
        self.lock_history().clone()
    }

    /// Pre-flight checks. Returns the resolved target commit.
    pub async fn can_rollback(&self, target: &str) -> Result<Commit, RollbackError> {
        if !self.config.enabled {
            return Err(RollbackError::Disabled);
        }
        if self.lock_history().executed() >= self.config.max_rollbacks {
            return Err(RollbackError::QuotaExceeded {
                limit: self.config.max_rollbacks,
            });
        }

        let commits = self
            .vcs
            .history(self.config.history_limit)
            .await
            .map_err(RollbackError::Vcs)?;
        commits
            .into_iter()
            .find(|c| c.matches(target))
            .ok_or_else(|| RollbackError::TargetNotFound(target.to_string()))
    }

    /// Run a rollback to `target` and return its final state.
    ///
    /// Always yields a terminal state: refused requests come back
    /// `cancelled`, failures `failed`, with the cause in `errors`.
    pub async fn execute(&self, reason: &str, target: &str) -> RollbackState {
        let state = RollbackState::new(id::run_id("rollback"), reason, target);
        let span = tracing::info_span!("rollback", rollback_id = %state.id);
        self.run(state).instrument(span).await
    }

    /// Apply the trigger policy to a validation result and roll back to the
    /// previous stable commit if it calls for one.
    pub async fn trigger_rollback(
        &self,
        report: &ValidationReport,
    ) -> Result<Option<RollbackState>, RollbackError> {
        if !policy::should_trigger(report) {
            return Ok(None);
        }
        let target = self.previous_stable_commit().await?;
        let reason = format!("validation failed: {}", report.errors.join("; "));
        Ok(Some(self.execute(&reason, &target).await))
    }

    /// The commit before head.
    ///
    /// This is the last known commit, not the last one that passed
    /// validation.
    pub async fn previous_stable_commit(&self) -> Result<String, RollbackError> {
        let commits = self
            .vcs
            .history(STABLE_HISTORY_WINDOW)
            .await
            .map_err(RollbackError::Vcs)?;
        commits
            .into_iter()
            .nth(1)
            .map(|c| c.hash)
            .ok_or(RollbackError::NoPreviousCommit)
    }

    async fn run(&self, mut state: RollbackState) -> RollbackState {
        let started = Instant::now();
        RollbackAuditEvent::new("rollback.requested", &state).emit();

        let Ok(_guard) = self.in_flight.try_lock() else {
            return self.cancel(state, RollbackError::InFlight, started);
        };

        let commit = match self.can_rollback(&state.target_commit).await {
            Ok(commit) => commit,
            Err(e) => return self.cancel(state, e, started),
        };
        state.target_commit = commit.hash;

        match self.vcs.current_revision().await {
            Ok(rev) => state.source_commit = rev,
            Err(e) => return self.fail(state, RollbackError::Vcs(e), started),
        }

        if let Err(e) = state.transition(RollbackStatus::InProgress) {
            return self.fail(state, e, started);
        }
        tracing::info!(
            source = %kestrel_core::vcs::short(&state.source_commit),
            target = %kestrel_core::vcs::short(&state.target_commit),
            reason = %state.reason,
            "starting rollback"
        );
        RollbackAuditEvent::new("rollback.started", &state).emit();

        match self.roll_back_steps(&mut state).await {
            Ok(()) => self.complete(state, started),
            Err(e) => self.fail(state, e, started),
        }
    }

    async fn roll_back_steps(&self, state: &mut RollbackState) -> Result<(), RollbackError> {
        state.resources = plan_rollback(
            self.vcs.as_ref(),
            &state.source_commit,
            &state.target_commit,
        )
        .await
        .map_err(RollbackError::Plan)?;
        tracing::info!(resources = state.resources.len(), "rollback plan computed");

        let backup = format!("backup-{}", Timestamp::now().as_second());
        match self.vcs.create_branch(&backup).await {
            Ok(()) => tracing::info!(branch = %backup, "backup branch created"),
            Err(e) => tracing::warn!(
                branch = %backup,
                error = %format_err_chain(&e),
                "failed to create backup branch"
            ),
        }

        self.vcs
            .reset(&state.target_commit, true)
            .await
            .map_err(RollbackError::Vcs)?;

        self.execute_resources(state).await?;

        tokio::time::sleep(self.config.settle_delay).await;
        self.validate(state).await
    }

    async fn execute_resources(&self, state: &mut RollbackState) -> Result<(), RollbackError> {
        order_for_execution(&mut state.resources);
        let mut failures = Vec::new();

        for resource in state.resources.iter_mut() {
            let id = resource.id();
            match self.apply(resource).await {
                Ok(status) => {
                    resource.status = status;
                    tracing::debug!(
                        resource = %id,
                        action = ?resource.action,
                        "resource rolled back"
                    );
                }
                Err(e) => {
                    let msg = format_err_chain(&e);
                    resource.status = ResourceStatus::Failed;
                    resource.error = Some(msg.clone());
                    tracing::warn!(resource = %id, error = %msg, "resource rollback failed");

                    if !self.config.preserve_data {
                        return Err(RollbackError::ResourceAction {
                            resource: id.to_string(),
                            source: e,
                        });
                    }
                    failures.push(format!("{id}: {msg}"));
                }
            }
        }

        if !failures.is_empty() {
            state
                .errors
                .push(RollbackError::ResourceActions { failures }.to_string());
        }
        Ok(())
    }

    async fn apply(&self, resource: &RollbackResource) -> Result<ResourceStatus, CoreError> {
        let desired = || {
            resource.previous_state.as_ref().ok_or_else(|| {
                CoreError::Rollback(format!("no target state for {}", resource.id()))
            })
        };
        match resource.action {
            RollbackAction::Delete => self.cluster.delete(&resource.id()).await?,
            RollbackAction::Create => self.cluster.create(desired()?).await?,
            RollbackAction::Revert | RollbackAction::Update => {
                self.cluster.update(desired()?).await?
            }
            RollbackAction::Skip => return Ok(ResourceStatus::Skipped),
        }
        Ok(ResourceStatus::Success)
    }

    async fn validate(&self, state: &mut RollbackState) -> Result<(), RollbackError> {
        let Some(validator) = &self.validator else {
            return Ok(());
        };
        let report = validator
            .validate(&self.config.validation_target)
            .await
            .map_err(RollbackError::ValidationUnavailable)?;
        let passed = report.success;
        let errors = report.errors.clone();
        state.validation_result = Some(report);
        if passed {
            tracing::info!("rollback validation passed");
            Ok(())
        } else {
            Err(RollbackError::Validation { errors })
        }
    }

    fn complete(&self, mut state: RollbackState, started: Instant) -> RollbackState {
        if let Err(e) = state.transition(RollbackStatus::Completed) {
            state.errors.push(e.to_string());
        }
        tracing::info!(rollback_id = %state.id, "rollback completed");
        self.finish(state, "rollback.completed", started)
    }

    fn fail(
        &self,
        mut state: RollbackState,
        err: RollbackError,
        started: Instant,
    ) -> RollbackState {
        tracing::warn!(rollback_id = %state.id, error = %format_err_chain(&err), "rollback failed");
        state.errors.push(format_err_chain(&err));
        if state.status == RollbackStatus::Pending {
            // pending cannot fail directly
            let _ = state.transition(RollbackStatus::InProgress);
        }
        if let Err(e) = state.transition(RollbackStatus::Failed) {
            state.errors.push(e.to_string());
        }
        self.finish(state, "rollback.failed", started)
    }

    fn cancel(
        &self,
        mut state: RollbackState,
        err: RollbackError,
        started: Instant,
    ) -> RollbackState {
        tracing::info!(rollback_id = %state.id, reason = %err, "rollback cancelled");
        state.errors.push(err.to_string());
        if let Err(e) = state.transition(RollbackStatus::Cancelled) {
            state.errors.push(e.to_string());
        }
        self.finish(state, "rollback.cancelled", started)
    }

    fn finish(
        &self,
        mut state: RollbackState,
        action: &'static str,
        started: Instant,
    ) -> RollbackState {
        state.duration = started.elapsed();
        RollbackAuditEvent::new(action, &state)
            .with_details(serde_json::json!({
                "resources": state.resources.len(),
                "errors": state.errors,
            }))
            .emit();

        let mut history = self.lock_history();
        history.record(state.clone());
        if let Some(persistence) = &self.persistence {
            if let Err(e) = persistence.flush(&history) {
                tracing::warn!(error = %e, "failed to persist rollback history");
            }
        }
        state
    }

    fn lock_history(&self) -> MutexGuard<'_, RollbackHistory> {
        match self.history.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl RollbackTrigger for RollbackEngine {
    fn roll_back<'a>(
        &'a self,
        reason: &'a str,
    ) -> BoxFuture<'a, Result<RollbackOutcome, CoreError>> {
        Box::pin(async move {
            let target = self
                .previous_stable_commit()
                .await
                .map_err(|e| CoreError::Rollback(format_err_chain(&e)))?;
            let state = self.execute(reason, &target).await;
            if state.status == RollbackStatus::Completed {
                Ok(state.outcome())
            } else {
                Err(CoreError::Rollback(format!(
                    "rollback {} {}: {}",
                    state.id,
                    state.status.as_str(),
                    state.errors.join("; ")
                )))
            }
        })
    }

    fn on_validation_failure<'a>(
        &'a self,
        report: &'a ValidationReport,
    ) -> BoxFuture<'a, Result<Option<RollbackOutcome>, CoreError>> {
        Box::pin(async move {
            self.trigger_rollback(report)
                .await
                .map(|state| state.map(|s| s.outcome()))
                .map_err(|e| CoreError::Rollback(format_err_chain(&e)))
        })
    }
}
