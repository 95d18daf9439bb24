use kestrel_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriftError {
    #[error("drift detection is disabled")]
    Disabled,

    #[error("failed to get desired state: {0}")]
    DesiredState(#[source] CoreError),

    #[error("failed to get actual state: {0}")]
    ActualState(#[source] CoreError),

    #[error("drift remediation failed for some resources: {}", .failures.join("; "))]
    Remediation { failures: Vec<String> },
}
