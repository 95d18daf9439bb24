use std::collections::BTreeMap;
use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use kestrel_core::ResourceIdentifier;

use crate::diff::FieldChange;
use crate::severity::Severity;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DriftType {
    /// Live resource differs from its declaration.
    Modified,
    /// Live resource is tracked by GitOps but no longer declared.
    Added,
    /// Declared resource is missing from the cluster.
    Deleted,
    /// No drift was classified.
    #[default]
    Unknown,
}

/// Outcome of comparing one resource. Created fresh every scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftResult {
    pub resource: ResourceIdentifier,
    pub has_drift: bool,
    pub drift_type: DriftType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
    /// Reported severity, `critical` for critical resources.
    pub severity: Severity,
    /// Severity of the change itself, before the critical-resource rule.
    pub impact: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_state: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_state: Option<Value>,
    pub checksum: String,
    pub detected_at: Timestamp,
    pub last_checked_at: Timestamp,
}

impl DriftResult {
    pub fn in_sync(resource: ResourceIdentifier, now: Timestamp) -> Self {
        let checksum = checksum(&resource, false);
        Self {
            resource,
            has_drift: false,
            drift_type: DriftType::Unknown,
            changes: Vec::new(),
            severity: Severity::Low,
            impact: Severity::Low,
            desired_state: None,
            actual_state: None,
            checksum,
            detected_at: now,
            last_checked_at: now,
        }
    }

    pub fn drifted(
        resource: ResourceIdentifier,
        drift_type: DriftType,
        changes: Vec<FieldChange>,
        desired_state: Option<Value>,
        actual_state: Option<Value>,
        now: Timestamp,
    ) -> Self {
        let severity = crate::severity::classify(&resource, drift_type, &changes);
        let impact = crate::severity::impact(drift_type, &changes);
        let checksum = checksum(&resource, true);
        Self {
            resource,
            has_drift: true,
            drift_type,
            changes,
            severity,
            impact,
            desired_state,
            actual_state,
            checksum,
            detected_at: now,
            last_checked_at: now,
        }
    }
}

/// Identity checksum of a result.
///
/// Depends only on apiVersion, kind, name and whether drift was found;
/// two results with different changes can share a checksum.
pub fn checksum(resource: &ResourceIdentifier, has_drift: bool) -> String {
    let input = format!(
        "{}-{}-{}-{}",
        resource.api_version, resource.kind, resource.name, has_drift
    );
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..8])
}

/// Counts over drifted resources only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftSummary {
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_type: BTreeMap<DriftType, usize>,
    pub by_kind: BTreeMap<String, usize>,
}

impl DriftSummary {
    pub fn from_results(results: &[DriftResult]) -> Self {
        let mut summary = Self::default();
        for result in results.iter().filter(|r| r.has_drift) {
            *summary.by_severity.entry(result.severity).or_default() += 1;
            *summary.by_type.entry(result.drift_type).or_default() += 1;
            *summary
                .by_kind
                .entry(result.resource.kind.clone())
                .or_default() += 1;
        }
        summary
    }
}

/// What remediation did after a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationReport {
    pub attempted: usize,
    pub succeeded: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_id: Option<String>,
}

impl RemediationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of one scan. Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftScanResult {
    pub scan_id: String,
    pub timestamp: Timestamp,
    #[serde(with = "kestrel_core::duration")]
    pub duration: Duration,
    pub total_resources: usize,
    pub drifted_resources: usize,
    pub results: Vec<DriftResult>,
    pub summary: DriftSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<RemediationReport>,
}

impl DriftScanResult {
    pub fn drifted(&self) -> impl Iterator<Item = &DriftResult> {
        self.results.iter().filter(|r| r.has_drift)
    }

    pub fn has_drift(&self) -> bool {
        self.drifted_resources > 0
    }
}
