use thiserror::Error;

/// Errors raised by collaborators (manifest source, cluster, version control,
/// validators, metrics) and by the shared parsing helpers.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("resource already exists: {0}")]
    AlreadyExists(String),

    #[error("cluster error: {0}")]
    Cluster(String),

    #[error("version control error: {0}")]
    Vcs(String),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("metrics error: {0}")]
    Metrics(String),

    #[error("rollback error: {0}")]
    Rollback(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Prepend a resource or target label to the error message.
    pub fn with_context(self, label: &str) -> Self {
        match self {
            Self::Cluster(msg) => Self::Cluster(format!("{label}: {msg}")),
            Self::Vcs(msg) => Self::Vcs(format!("{label}: {msg}")),
            Self::Manifest(msg) => Self::Manifest(format!("{label}: {msg}")),
            Self::Validation(msg) => Self::Validation(format!("{label}: {msg}")),
            Self::Metrics(msg) => Self::Metrics(format!("{label}: {msg}")),
            other => other,
        }
    }
}

/// Walk the full error chain and join all causes into one string.
///
/// Subprocess and transport errors often have terse `Display` impls
/// but useful detail in the source chain. A cause whose text the message
/// already ends with (`"failed: {0}"` over a `#[source]`) is not repeated.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !msg.ends_with(&text) {
            msg.push_str(": ");
            msg.push_str(&text);
        }
        source = cause.source();
    }
    msg
}
