use serde::{Deserialize, Serialize};

/// Kinds watched for drift unless the config narrows or extends the list.
pub const DEFAULT_MONITORED_KINDS: &[&str] = &[
    "Deployment",
    "Service",
    "ConfigMap",
    "Secret",
    "ServiceAccount",
    "ClusterRole",
    "ClusterRoleBinding",
    "Role",
    "RoleBinding",
    "PersistentVolume",
    "PersistentVolumeClaim",
    "StorageClass",
    "Ingress",
    "NetworkPolicy",
    "VirtualService",
    "DestinationRule",
    "VNF",
    "WorkloadCluster",
    "PackageRevision",
    "Repository",
];

/// What a scan does once drift is found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemediationMode {
    /// Report only.
    #[default]
    Alert,
    /// Push declared state back onto the cluster.
    Correct,
    /// Hand off to the rollback engine.
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriftConfig {
    pub enabled: bool,
    pub remediation: RemediationMode,
    /// Extra fields excluded before comparison: top-level names (`data`) or
    /// dotted paths (`spec.replicas`).
    pub ignore_fields: Vec<String>,
    pub monitored_kinds: Vec<String>,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            remediation: RemediationMode::Alert,
            ignore_fields: Vec::new(),
            monitored_kinds: DEFAULT_MONITORED_KINDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

impl DriftConfig {
    pub fn monitors(&self, kind: &str) -> bool {
        self.monitored_kinds.iter().any(|k| k == kind)
    }
}
