//! Dependency-graphed validation pipelines.
//!
//! A pipeline is a list of [`Stage`]s. The [`StageOrchestrator`] runs every
//! stage whose dependencies are done, groups adjacent `parallel` stages into
//! concurrent task sets, applies per-stage timeout and retry through the
//! [`StageExecutor`], and folds the outcomes into a [`PipelineResult`] with
//! Definition of Done compliance flags.

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod handler;
pub mod pipeline;
pub mod result;
pub mod schedule;
pub mod stage;
pub mod stages;

pub use crate::config::PipelineConfig;
pub use crate::context::Collaborators;
pub use crate::error::{PipelineError, StageError};
pub use crate::executor::StageExecutor;
pub use crate::handler::{HandlerRegistry, StageHandler, StageOutput};
pub use crate::pipeline::StageOrchestrator;
pub use crate::result::{
    DodCompliance, PipelineMetrics, PipelineResult, PipelineSummary, StageResult,
};
pub use crate::schedule::{group_parallel, ready_set, validate_stages};
pub use crate::stage::{FailureStrategy, Stage, StageType};
