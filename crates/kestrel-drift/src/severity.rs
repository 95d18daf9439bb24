use serde::{Deserialize, Serialize};
use serde_json::Value;

use kestrel_core::ResourceIdentifier;
use kestrel_core::resource;

use crate::diff::FieldChange;
use crate::result::DriftType;

/// Kinds whose drift is always critical.
const CRITICAL_KINDS: &[&str] = &[
    "Deployment",
    "Service",
    "Secret",
    "ClusterRole",
    "ClusterRoleBinding",
];

/// Name fragments marking radio, core and transport network workloads.
const CRITICAL_NAME_MARKERS: &[&str] = &["ran-", "cn-", "tn-", "orchestrator"];

/// Field names whose change makes a modification high impact.
const HIGH_IMPACT_FIELDS: &[&str] = &[
    "replicas",
    "image",
    "ports",
    "env",
    "resources",
    "nodeSelector",
    "tolerations",
];

/// Above this many changes an otherwise routine modification is medium.
const MANY_CHANGES: usize = 10;

const MANAGED_ANNOTATIONS: &[&str] = &[
    "config.kubernetes.io/local-config",
    "config.k8s.io/local-config",
    "argocd.argoproj.io/tracking-id",
    "configsync.gke.io/resource-id",
    "gitops.oran.io/managed",
];

const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

pub fn is_critical_resource(id: &ResourceIdentifier) -> bool {
    CRITICAL_KINDS.contains(&id.kind.as_str())
        || CRITICAL_NAME_MARKERS
            .iter()
            .any(|marker| id.name.contains(marker))
}

/// Severity judged on the change alone, ignoring how critical the
/// resource is.
pub fn impact(drift_type: DriftType, changes: &[FieldChange]) -> Severity {
    match drift_type {
        DriftType::Deleted => Severity::High,
        DriftType::Added => Severity::Medium,
        DriftType::Modified => {
            if changes.iter().any(|c| touches_high_impact_field(&c.path)) {
                Severity::High
            } else if changes.len() > MANY_CHANGES {
                Severity::Medium
            } else {
                Severity::Low
            }
        }
        DriftType::Unknown => Severity::Low,
    }
}

/// Reported severity: critical resources are critical whatever the change.
pub fn classify(
    id: &ResourceIdentifier,
    drift_type: DriftType,
    changes: &[FieldChange],
) -> Severity {
    if is_critical_resource(id) {
        Severity::Critical
    } else {
        impact(drift_type, changes)
    }
}

/// `spec.template.spec.containers[0].image` touches `image`.
fn touches_high_impact_field(path: &str) -> bool {
    path.split('.')
        .map(|segment| segment.split('[').next().unwrap_or(segment))
        .any(|segment| HIGH_IMPACT_FIELDS.contains(&segment))
}

/// True when a live resource carries a GitOps ownership marker.
pub fn is_gitops_managed(doc: &Value) -> bool {
    let annotated = resource::annotations(doc)
        .is_some_and(|a| MANAGED_ANNOTATIONS.iter().any(|key| a.contains_key(*key)));
    let labelled = resource::labels(doc).is_some_and(|l| l.contains_key(MANAGED_BY_LABEL));
    annotated || labelled
}
