use kestrel_core::CoreError;
use thiserror::Error;

use crate::state::RollbackStatus;

#[derive(Debug, Error)]
pub enum RollbackError {
    #[error("rollback is disabled")]
    Disabled,

    #[error("maximum rollback limit reached ({limit})")]
    QuotaExceeded { limit: usize },

    #[error("target commit {0} not found in recent history")]
    TargetNotFound(String),

    #[error("another rollback is already in progress")]
    InFlight,

    #[error("no previous commit available")]
    NoPreviousCommit,

    #[error("version control failed: {0}")]
    Vcs(#[source] CoreError),

    #[error("rollback planning failed: {0}")]
    Plan(#[source] CoreError),

    #[error("resource rollback failed for {resource}: {source}")]
    ResourceAction {
        resource: String,
        #[source]
        source: CoreError,
    },

    #[error("resource rollback failed for some resources: {}", .failures.join("; "))]
    ResourceActions { failures: Vec<String> },

    #[error("rollback validation failed: {}", .errors.join("; "))]
    Validation { errors: Vec<String> },

    #[error("rollback validation could not run: {0}")]
    ValidationUnavailable(#[source] CoreError),

    #[error("invalid rollback transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: RollbackStatus,
        to: RollbackStatus,
    },

    #[error("rollback history persistence failed: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("rollback history serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
