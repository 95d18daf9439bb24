use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RollbackConfig {
    pub enabled: bool,
    /// Rollbacks this engine may run before refusing further requests.
    pub max_rollbacks: usize,
    /// Keep going after a resource action fails instead of aborting the plan.
    pub preserve_data: bool,
    /// How many recent commits a target revision is searched in.
    pub history_limit: usize,
    /// Pause between resource execution and re-validation.
    #[serde(with = "kestrel_core::duration")]
    pub settle_delay: Duration,
    /// Target passed to the validator after a rollback.
    pub validation_target: String,
    /// Where rollback history is persisted. Unset keeps it in memory only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_path: Option<PathBuf>,
}

impl Default for RollbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_rollbacks: 5,
            preserve_data: false,
            history_limit: 100,
            settle_delay: Duration::from_secs(30),
            validation_target: "rollback-validation".to_string(),
            history_path: None,
        }
    }
}
