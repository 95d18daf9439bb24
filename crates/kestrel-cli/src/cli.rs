use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kestrel")]
#[command(version)]
#[command(about = "GitOps drift detection, rollback and validation pipelines", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (YAML or JSON). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare declared manifests against a live snapshot
    Drift(SnapshotArgs),

    /// Show the resource actions a rollback to TARGET would take
    RollbackPlan(RollbackPlanArgs),

    /// Run the configured validation pipeline
    Pipeline(PipelineArgs),
}

#[derive(Args)]
pub struct SnapshotArgs {
    /// Directory of declared manifests
    #[arg(long)]
    pub manifests: PathBuf,

    /// Directory of exported live resources
    #[arg(long)]
    pub live: PathBuf,
}

#[derive(Args)]
pub struct RollbackPlanArgs {
    /// Git working tree holding the manifests
    #[arg(long)]
    pub repo: PathBuf,

    /// Revision to roll back to (full or abbreviated hash)
    #[arg(long)]
    pub target: String,
}

#[derive(Args)]
pub struct PipelineArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,

    /// Git working tree; enables git-sync stages and rollback
    #[arg(long)]
    pub repo: Option<PathBuf>,
}
