//! kestrel-core
//!
//! Shared vocabulary of the kestrel GitOps validation engine: resource
//! identity, manifest parsing, and the narrow collaborator contracts the
//! drift, rollback and pipeline engines consume.
//!
//! Collaborators:
//! - [`ManifestSource`]: declared resources from a file tree
//! - [`ClusterState`]: live resources by kind
//! - [`VersionControl`]: history, diff, checkout/reset, branch
//! - [`Validator`]: readiness / sync / package checks
//! - [`MetricsCollector`]: per-cluster performance metrics
//! - [`RollbackTrigger`]: request a rollback from another subsystem

use std::future::Future;
use std::pin::Pin;

pub mod cluster;
pub mod duration;
pub mod error;
pub mod id;
pub mod manifest;
pub mod metrics;
pub mod resource;
pub mod trigger;
pub mod validate;
pub mod vcs;

pub use crate::cluster::{ClusterState, KindInfo};
pub use crate::error::{CoreError, format_err_chain};
pub use crate::manifest::{DeclaredResource, ManifestSource};
pub use crate::metrics::{MetricsCollector, MetricsSample, PerformanceThresholds};
pub use crate::resource::{ResourceIdentifier, ResourceKey};
pub use crate::trigger::{RollbackOutcome, RollbackTrigger};
pub use crate::validate::{ValidationReport, Validator};
pub use crate::vcs::{Commit, RepoStatus, VersionControl};

/// Boxed future returned by collaborator traits so they stay dyn-compatible.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
