use std::time::Duration;

use kestrel_core::CoreError;
use thiserror::Error;

/// Why one stage attempt failed.
#[derive(Debug, Error)]
pub enum StageError {
    /// Business-level failure: the stage ran and its check did not pass.
    #[error("{0}")]
    Failed(String),

    #[error("stage timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("stage cancelled: {0}")]
    Cancelled(String),

    #[error("{context}: {source}")]
    Collaborator {
        context: String,
        #[source]
        source: CoreError,
    },

    #[error("{0} not configured")]
    MissingCollaborator(&'static str),

    #[error("invalid stage config: {0}")]
    InvalidConfig(String),

    #[error("no handler registered for stage type {0}")]
    NoHandler(String),
}

impl StageError {
    pub fn collaborator(context: impl Into<String>, source: CoreError) -> Self {
        Self::Collaborator {
            context: context.into(),
            source,
        }
    }

    /// Deadline and cancellation failures are never retried.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Cancelled(_))
    }
}

/// Problems that stop a pipeline from starting at all.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline is disabled")]
    Disabled,

    #[error("duplicate stage name: {0}")]
    DuplicateStage(String),

    #[error("stage {stage} depends on unknown stage {dependency}")]
    UnknownDependency { stage: String, dependency: String },

    #[error("no ready stages found, circular dependency among: {}", .stages.join(", "))]
    CircularDependency { stages: Vec<String> },
}
