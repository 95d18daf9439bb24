use serde::Serialize;
use tracing::info;

use crate::state::RollbackState;

/// A structured audit record of a rollback lifecycle step.
///
/// Logged via `tracing` under the `audit.*` fields so log pipelines can
/// route them separately from operational logs.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackAuditEvent {
    pub action: &'static str,
    pub rollback_id: String,
    pub status: &'static str,
    pub target_commit: String,
    pub reason: String,
    pub details: Option<serde_json::Value>,
}

impl RollbackAuditEvent {
    pub fn new(action: &'static str, state: &RollbackState) -> Self {
        Self {
            action,
            rollback_id: state.id.clone(),
            status: state.status.as_str(),
            target_commit: state.target_commit.clone(),
            reason: state.reason.clone(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn emit(&self) {
        let details = self
            .details
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();
        info!(
            audit.action = self.action,
            audit.rollback_id = %self.rollback_id,
            audit.status = self.status,
            audit.target_commit = %self.target_commit,
            audit.reason = %self.reason,
            audit.details = %details,
            "audit event"
        );
    }
}
