use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::RollbackError;
use crate::state::{RollbackState, RollbackStatus};

/// Entries kept before the oldest are dropped.
const MAX_ENTRIES: usize = 100;

/// Terminal rollback runs, oldest first.
///
/// Only the last entries are kept; the quota counter covers every run
/// ever recorded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackHistory {
    pub operations: Vec<RollbackState>,
    #[serde(default)]
    executed: usize,
}

impl RollbackHistory {
    pub fn record(&mut self, state: RollbackState) {
        if counts_against_quota(&state) {
            self.executed += 1;
        }
        self.operations.push(state);
        if self.operations.len() > MAX_ENTRIES {
            let excess = self.operations.len() - MAX_ENTRIES;
            self.operations.drain(..excess);
        }
    }

    /// Runs that count against the rollback quota. Requests refused before
    /// starting do not.
    pub fn executed(&self) -> usize {
        let retained = self.operations.iter().filter(|op| counts_against_quota(op)).count();
        self.executed.max(retained)
    }

    pub fn last(&self) -> Option<&RollbackState> {
        self.operations.last()
    }
}

fn counts_against_quota(state: &RollbackState) -> bool {
    state.status != RollbackStatus::Cancelled || !state.source_commit.is_empty()
}

/// Local JSON copy of the rollback history.
pub struct HistoryPersistence {
    pub local_path: PathBuf,
}

impl HistoryPersistence {
    pub fn new(local_path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: local_path.into(),
        }
    }

    /// Atomic write: tmp file, then rename over the previous copy.
    pub fn flush(&self, history: &RollbackHistory) -> Result<(), RollbackError> {
        let json = serde_json::to_vec_pretty(history)?;
        if let Some(parent) = self.local_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.local_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json)?;
        std::fs::rename(&tmp_path, &self.local_path)?;

        tracing::debug!(path = %self.local_path.display(), "rollback history flushed");
        Ok(())
    }

    /// Load the saved history, or an empty one if nothing was saved yet.
    pub fn load(&self) -> Result<RollbackHistory, RollbackError> {
        match std::fs::read(&self.local_path) {
            Ok(bytes) => {
                let history: RollbackHistory = serde_json::from_slice(&bytes)?;
                tracing::debug!(
                    path = %self.local_path.display(),
                    entries = history.operations.len(),
                    "rollback history loaded"
                );
                Ok(history)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no rollback history found, starting fresh");
                Ok(RollbackHistory::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}
