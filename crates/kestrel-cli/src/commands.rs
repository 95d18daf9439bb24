use std::path::Path;
use std::sync::Arc;

use eyre::{Result, WrapErr};
use serde_json::{Value, json};

use kestrel_core::{ClusterState, RollbackTrigger, Validator, VersionControl};
use kestrel_drift::DriftEngine;
use kestrel_pipeline::{Collaborators, StageOrchestrator};
use kestrel_rollback::{RollbackEngine, order_for_execution, plan_rollback};
use kestrel_sources::{
    FsManifestSource, GitCli, MemoryCluster, PackageValidator, ReadinessValidator, SyncValidator,
};

use crate::cli::{PipelineArgs, RollbackPlanArgs, SnapshotArgs};
use crate::config::KestrelConfig;

pub async fn drift(config: &KestrelConfig, args: &SnapshotArgs) -> Result<Value> {
    let cluster = load_snapshot(&args.live)?;
    let engine = DriftEngine::new(
        config.drift.clone(),
        Arc::new(FsManifestSource::new(&args.manifests)),
        cluster,
    );

    let scan = engine.scan().await?;
    tracing::info!(
        scan_id = %scan.scan_id,
        total = scan.total_resources,
        drifted = scan.drifted_resources,
        "drift scan finished"
    );
    Ok(serde_json::to_value(&scan)?)
}

pub async fn rollback_plan(config: &KestrelConfig, args: &RollbackPlanArgs) -> Result<Value> {
    let git = GitCli::new(&args.repo);

    let current = git.current_revision().await?;
    let history = git.history(config.rollback.history_limit).await?;
    let target = history
        .iter()
        .find(|commit| commit.matches(&args.target))
        .ok_or_else(|| {
            eyre::eyre!(
                "revision {} not found in the last {} commits",
                args.target,
                config.rollback.history_limit
            )
        })?;

    let mut resources = plan_rollback(&git, &current, &target.hash).await?;
    order_for_execution(&mut resources);

    Ok(json!({
        "sourceCommit": current,
        "targetCommit": target.hash,
        "resources": resources,
    }))
}

pub async fn pipeline(config: &KestrelConfig, args: &PipelineArgs) -> Result<Value> {
    let manifests = &args.snapshot.manifests;
    let cluster = load_snapshot(&args.snapshot.live)?;
    let readiness: Arc<dyn Validator> = Arc::new(ReadinessValidator::new(cluster.clone()));

    let repo = args.repo.clone().or_else(|| config.git.repository.clone());
    let vcs: Option<Arc<dyn VersionControl>> =
        repo.map(|repo| Arc::new(GitCli::new(repo)) as Arc<dyn VersionControl>);

    let rollback: Option<Arc<dyn RollbackTrigger>> = match &vcs {
        Some(vcs) if config.rollback.enabled => {
            let engine = RollbackEngine::new(config.rollback.clone(), vcs.clone(), cluster.clone())
                .with_validator(readiness.clone())
                .restore_history()?;
            Some(Arc::new(engine))
        }
        _ => None,
    };

    let mut drift = DriftEngine::new(
        config.drift.clone(),
        Arc::new(FsManifestSource::new(manifests)),
        cluster.clone(),
    );
    if let Some(trigger) = &rollback {
        drift = drift.with_rollback(trigger.clone());
    }

    let mut clusters = config.cluster_names();
    if clusters.is_empty() {
        clusters.push("local".to_string());
    }

    let collaborators = Collaborators {
        vcs,
        package_validator: Some(Arc::new(PackageValidator::new(manifests))),
        sync_validator: Some(Arc::new(SyncValidator::new(manifests, cluster.clone()))),
        cluster_validator: Some(readiness.clone()),
        health_validator: Some(readiness),
        drift: Some(Arc::new(drift)),
        rollback,
        clusters,
        thresholds: config.performance.clone(),
        ..Collaborators::default()
    };

    let result = StageOrchestrator::new(config.e2e.clone(), collaborators)
        .run()
        .await?;
    if !result.success {
        tracing::warn!(
            pipeline_id = %result.pipeline_id,
            failed = result.summary.failed_stages,
            "pipeline did not succeed"
        );
    }
    Ok(serde_json::to_value(&result)?)
}

fn load_snapshot(dir: &Path) -> Result<Arc<dyn ClusterState>> {
    let cluster = MemoryCluster::load_dir(dir)
        .wrap_err_with(|| format!("failed to load live snapshot from {}", dir.display()))?;
    Ok(Arc::new(cluster))
}
