use serde::{Deserialize, Serialize};

use crate::BoxFuture;
use crate::error::CoreError;
use crate::validate::ValidationReport;

/// What a requested rollback ended as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackOutcome {
    pub rollback_id: String,
    pub status: String,
    pub target_commit: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Entry point other subsystems use to request a rollback without
/// depending on the rollback engine itself.
pub trait RollbackTrigger: Send + Sync {
    /// Roll back to the last known good revision unconditionally.
    fn roll_back<'a>(&'a self, reason: &'a str)
    -> BoxFuture<'a, Result<RollbackOutcome, CoreError>>;

    /// Apply the trigger policy to a failed validation. `None` when the
    /// policy does not call for a rollback.
    fn on_validation_failure<'a>(
        &'a self,
        report: &'a ValidationReport,
    ) -> BoxFuture<'a, Result<Option<RollbackOutcome>, CoreError>>;
}
