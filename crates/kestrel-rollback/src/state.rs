use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use kestrel_core::{ResourceIdentifier, RollbackOutcome, ValidationReport};

use crate::error::RollbackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl RollbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    fn can_become(&self, next: RollbackStatus) -> bool {
        use RollbackStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (InProgress, Cancelled)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollbackAction {
    /// Apply the target revision's version of a resource present in both.
    Revert,
    Delete,
    Create,
    Update,
    Skip,
}

impl RollbackAction {
    /// Deletes run first, then updates, then creates.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Delete => 1,
            Self::Update | Self::Revert => 2,
            Self::Create => 3,
            Self::Skip => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    #[default]
    Pending,
    Success,
    Failed,
    Skipped,
}

/// One planned resource action and, once executed, its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackResource {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    pub action: RollbackAction,
    #[serde(default)]
    pub status: ResourceStatus,
    /// The resource as declared at the target revision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_state: Option<Value>,
    /// The resource as declared at the current head.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_state: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RollbackResource {
    pub fn new(id: &ResourceIdentifier, action: RollbackAction) -> Self {
        Self {
            api_version: id.api_version.clone(),
            kind: id.kind.clone(),
            name: id.name.clone(),
            namespace: id.namespace.clone(),
            action,
            status: ResourceStatus::Pending,
            previous_state: None,
            current_state: None,
            error: None,
        }
    }

    pub fn id(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(&self.api_version, &self.kind, &self.namespace, &self.name)
    }
}

/// One supervised rollback run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackState {
    pub id: String,
    pub timestamp: Timestamp,
    pub reason: String,
    pub source_commit: String,
    pub target_commit: String,
    pub status: RollbackStatus,
    pub resources: Vec<RollbackResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_result: Option<ValidationReport>,
    #[serde(with = "kestrel_core::duration")]
    pub duration: Duration,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl RollbackState {
    pub fn new(id: String, reason: impl Into<String>, target_commit: impl Into<String>) -> Self {
        Self {
            id,
            timestamp: Timestamp::now(),
            reason: reason.into(),
            source_commit: String::new(),
            target_commit: target_commit.into(),
            status: RollbackStatus::Pending,
            resources: Vec::new(),
            validation_result: None,
            duration: Duration::ZERO,
            errors: Vec::new(),
        }
    }

    /// Move to `next`. Terminal states are never left.
    pub fn transition(&mut self, next: RollbackStatus) -> Result<(), RollbackError> {
        if !self.status.can_become(next) {
            return Err(RollbackError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn outcome(&self) -> RollbackOutcome {
        RollbackOutcome {
            rollback_id: self.id.clone(),
            status: self.status.as_str().to_string(),
            target_commit: self.target_commit.clone(),
            errors: self.errors.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        let mut state = RollbackState::new("rollback-1".into(), "test", "abc1234");
        state.transition(RollbackStatus::InProgress).unwrap();
        state.transition(RollbackStatus::Completed).unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn terminal_states_are_never_reentered() {
        let mut state = RollbackState::new("rollback-1".into(), "test", "abc1234");
        state.transition(RollbackStatus::Cancelled).unwrap();
        for next in [
            RollbackStatus::Pending,
            RollbackStatus::InProgress,
            RollbackStatus::Completed,
            RollbackStatus::Failed,
            RollbackStatus::Cancelled,
        ] {
            assert!(state.transition(next).is_err());
        }
        assert_eq!(state.status, RollbackStatus::Cancelled);
    }

    #[test]
    fn pending_cannot_complete_directly() {
        let mut state = RollbackState::new("rollback-1".into(), "test", "abc1234");
        assert!(matches!(
            state.transition(RollbackStatus::Completed),
            Err(RollbackError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(RollbackStatus::InProgress).unwrap(),
            "in_progress"
        );
    }
}
