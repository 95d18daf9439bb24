use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::stage::{FailureStrategy, Stage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    pub enabled: bool,
    pub stages: Vec<Stage>,
    /// Deadline for the whole run. Unset or zero means no limit.
    #[serde(with = "kestrel_core::duration::option")]
    pub max_duration: Option<Duration>,
    pub failure_strategy: FailureStrategy,
    /// Base of the linear retry backoff (attempt index times this).
    #[serde(with = "kestrel_core::duration")]
    pub retry_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stages: Vec::new(),
            max_duration: None,
            failure_strategy: FailureStrategy::Stop,
            retry_delay: Duration::from_secs(5),
        }
    }
}
