//! Concrete collaborators for the kestrel engines.
//!
//! - [`FsManifestSource`]: declared resources from a manifest directory
//! - [`GitCli`]: version control through the `git` binary
//! - [`MemoryCluster`]: an in-memory cluster, optionally loaded from a
//!   directory of exported resources
//! - [`ReadinessValidator`], [`PackageValidator`], [`SyncValidator`]: offline
//!   checks over the above

pub mod fs;
pub mod git;
pub mod memory;
pub mod validate;

pub use crate::fs::{FsManifestSource, scan_tree};
pub use crate::git::{GitCli, parse_log};
pub use crate::memory::MemoryCluster;
pub use crate::validate::{PackageValidator, ReadinessValidator, SyncValidator};
