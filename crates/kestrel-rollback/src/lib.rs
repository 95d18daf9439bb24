//! Supervised rollback to a historical revision.
//!
//! A rollback resolves the target commit, diffs the declared manifests
//! between head and target into per-resource actions, resets version
//! control, applies the actions to the cluster in priority order, and
//! re-validates.
//!
//! ```text
//! pending ─► in_progress ─► completed
//!    │            ├───────► failed
//!    └────────────┴───────► cancelled
//! ```

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod plan;
pub mod policy;
pub mod state;

pub use crate::audit::RollbackAuditEvent;
pub use crate::config::RollbackConfig;
pub use crate::engine::RollbackEngine;
pub use crate::error::RollbackError;
pub use crate::history::{HistoryPersistence, RollbackHistory};
pub use crate::plan::{order_for_execution, plan_file, plan_rollback};
pub use crate::policy::should_trigger;
pub use crate::state::{
    ResourceStatus, RollbackAction, RollbackResource, RollbackState, RollbackStatus,
};
