//! Drift detection and reconciliation.
//!
//! A scan reads every declared resource, lists the live resources of the
//! monitored kinds, and classifies the divergence of each one. Results are
//! cached per resource; remediation (correct or rollback) is optional.

pub mod cache;
pub mod compare;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod filter;
pub mod result;
pub mod severity;

pub use crate::cache::DriftCache;
pub use crate::compare::compare_states;
pub use crate::config::{DriftConfig, RemediationMode};
pub use crate::diff::{ChangeAction, FieldChange};
pub use crate::engine::DriftEngine;
pub use crate::error::DriftError;
pub use crate::result::{
    DriftResult, DriftScanResult, DriftSummary, DriftType, RemediationReport, checksum,
};
pub use crate::severity::Severity;
