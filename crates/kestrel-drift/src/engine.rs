use std::sync::Arc;
use std::time::Instant;

use jiff::Timestamp;
use serde_json::Value;

use kestrel_core::{
    ClusterState, ManifestSource, ResourceKey, RollbackTrigger, format_err_chain, id,
};

use crate::cache::DriftCache;
use crate::compare::compare_states;
use crate::config::{DriftConfig, RemediationMode};
use crate::error::DriftError;
use crate::result::{DriftResult, DriftScanResult, DriftSummary, DriftType, RemediationReport};
use crate::severity::Severity;

/// Compares declared manifests against live cluster state.
pub struct DriftEngine {
    config: DriftConfig,
    manifests: Arc<dyn ManifestSource>,
    cluster: Arc<dyn ClusterState>,
    rollback: Option<Arc<dyn RollbackTrigger>>,
    cache: Arc<DriftCache>,
}

impl DriftEngine {
    pub fn new(
        config: DriftConfig,
        manifests: Arc<dyn ManifestSource>,
        cluster: Arc<dyn ClusterState>,
    ) -> Self {
        Self {
            config,
            manifests,
            cluster,
            rollback: None,
            cache: Arc::new(DriftCache::new()),
        }
    }

    /// Share a cache with other owners (e.g. a status endpoint).
    pub fn with_cache(mut self, cache: Arc<DriftCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Wire the collaborator used by `rollback` remediation.
    pub fn with_rollback(mut self, trigger: Arc<dyn RollbackTrigger>) -> Self {
        self.rollback = Some(trigger);
        self
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    /// Run one full scan.
    ///
    /// Failing to read declared state or to enumerate live kinds aborts the
    /// scan. Remediation failures do not: they are reported in
    /// `DriftScanResult::remediation`.
    pub async fn scan(&self) -> Result<DriftScanResult, DriftError> {
        if !self.config.enabled {
            return Err(DriftError::Disabled);
        }

        let started = Instant::now();
        let timestamp = Timestamp::now();
        let scan_id = id::run_id("drift-scan");
        tracing::info!(scan_id = %scan_id, "starting drift scan");

        let desired = self
            .manifests
            .declared_resources()
            .await
            .map_err(DriftError::DesiredState)?;
        let actual = self.actual_state().await?;

        let results = compare_states(&self.config, &desired, &actual, timestamp);
        self.cache.record(timestamp, &results);

        let drifted_resources = results.iter().filter(|r| r.has_drift).count();
        let summary = DriftSummary::from_results(&results);
        tracing::info!(
            scan_id = %scan_id,
            drifted = drifted_resources,
            total = results.len(),
            "drift scan completed"
        );

        let remediation = if self.config.remediation != RemediationMode::Alert
            && drifted_resources > 0
        {
            let report = self.remediate_results(&results).await;
            if !report.is_success() {
                tracing::warn!(
                    scan_id = %scan_id,
                    failures = %report.failures.join("; "),
                    "drift remediation failed"
                );
            }
            Some(report)
        } else {
            None
        };

        Ok(DriftScanResult {
            scan_id,
            timestamp,
            duration: started.elapsed(),
            total_resources: results.len(),
            drifted_resources,
            results,
            summary,
            remediation,
        })
    }

    /// Remediate drifted results per the configured mode.
    ///
    /// Every resource is attempted; failures are joined into one error.
    pub async fn remediate(
        &self,
        results: &[DriftResult],
    ) -> Result<RemediationReport, DriftError> {
        let report = self.remediate_results(results).await;
        if report.is_success() {
            Ok(report)
        } else {
            Err(DriftError::Remediation {
                failures: report.failures,
            })
        }
    }

    /// Snapshot of the last known result per resource.
    pub fn drift_status(&self) -> Vec<DriftResult> {
        self.cache.snapshot()
    }

    pub fn cached(&self, key: &ResourceKey) -> Option<DriftResult> {
        self.cache.get(key)
    }

    pub fn last_scan(&self) -> Option<Timestamp> {
        self.cache.last_scan()
    }

    async fn actual_state(&self) -> Result<Vec<Value>, DriftError> {
        let kinds = self
            .cluster
            .list_kinds()
            .await
            .map_err(DriftError::ActualState)?;

        let mut resources = Vec::new();
        for kind in kinds.iter().filter(|k| self.config.monitors(&k.kind)) {
            match self.cluster.list(kind, None).await {
                Ok(items) => resources.extend(items),
                Err(e) => {
                    tracing::warn!(
                        kind = %kind.kind,
                        api_version = %kind.api_version,
                        error = %format_err_chain(&e),
                        "failed to list resources, skipping kind"
                    );
                }
            }
        }
        Ok(resources)
    }

    async fn remediate_results(&self, results: &[DriftResult]) -> RemediationReport {
        match self.config.remediation {
            RemediationMode::Alert => RemediationReport::default(),
            RemediationMode::Correct => self.correct(results).await,
            RemediationMode::Rollback => self.request_rollback(results).await,
        }
    }

    async fn correct(&self, results: &[DriftResult]) -> RemediationReport {
        let mut report = RemediationReport::default();

        for result in results.iter().filter(|r| r.has_drift) {
            report.attempted += 1;
            match self.correct_one(result).await {
                Ok(()) => {
                    report.succeeded += 1;
                    tracing::info!(
                        resource = %result.resource,
                        drift_type = ?result.drift_type,
                        "drift corrected"
                    );
                }
                Err(msg) => report.failures.push(format!("{}: {msg}", result.resource)),
            }
        }

        report
    }

    async fn correct_one(&self, result: &DriftResult) -> Result<(), String> {
        let desired = || {
            result
                .desired_state
                .as_ref()
                .ok_or_else(|| "no desired state available".to_string())
        };
        let outcome = match result.drift_type {
            DriftType::Modified => self.cluster.update(desired()?).await,
            DriftType::Deleted => self.cluster.create(desired()?).await,
            DriftType::Added => self.cluster.delete(&result.resource).await,
            DriftType::Unknown => return Ok(()),
        };
        outcome.map_err(|e| format_err_chain(&e))
    }

    async fn request_rollback(&self, results: &[DriftResult]) -> RemediationReport {
        let mut report = RemediationReport {
            attempted: 1,
            ..RemediationReport::default()
        };

        let Some(trigger) = &self.rollback else {
            report
                .failures
                .push("rollback remediation not configured".to_string());
            return report;
        };

        let drifted = results.iter().filter(|r| r.has_drift).count();
        let critical = results
            .iter()
            .filter(|r| r.has_drift && r.severity == Severity::Critical)
            .count();
        let reason = format!("drift detected in {drifted} resources ({critical} critical)");

        match trigger.roll_back(&reason).await {
            Ok(outcome) => {
                tracing::info!(
                    rollback_id = %outcome.rollback_id,
                    status = %outcome.status,
                    "drift rollback requested"
                );
                report.rollback_id = Some(outcome.rollback_id);
                report.succeeded = 1;
            }
            Err(e) => report.failures.push(format_err_chain(&e)),
        }
        report
    }
}
