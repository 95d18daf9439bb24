use std::collections::BTreeMap;

use jiff::Timestamp;
use serde_json::Value;

use kestrel_core::{DeclaredResource, ResourceIdentifier, ResourceKey};

use crate::config::DriftConfig;
use crate::diff;
use crate::result::{DriftResult, DriftType};
use crate::severity;

/// Compare declared against live state and classify every resource.
///
/// Declared resources come first, in key order, followed by live
/// resources that GitOps tracks but nothing declares. Live resources
/// without a managed marker are not reported. Every declared resource is
/// compared whatever its kind; `actual` is expected to hold only the
/// monitored kinds.
pub fn compare_states(
    config: &DriftConfig,
    desired: &[DeclaredResource],
    actual: &[Value],
    now: Timestamp,
) -> Vec<DriftResult> {
    let desired: BTreeMap<ResourceKey, &DeclaredResource> = desired
        .iter()
        .map(|d| (d.id.key(), d))
        .collect();

    let actual: BTreeMap<ResourceKey, (ResourceIdentifier, &Value)> = actual
        .iter()
        .filter_map(|doc| ResourceIdentifier::from_document(doc).map(|id| (id.key(), (id, doc))))
        .collect();

    let mut results = Vec::with_capacity(desired.len());

    for (key, declared) in &desired {
        let result = match actual.get(key) {
            None => DriftResult::drifted(
                declared.id.clone(),
                DriftType::Deleted,
                Vec::new(),
                Some(declared.content.clone()),
                None,
                now,
            ),
            Some((_, live)) => {
                let changes =
                    diff::compare_resources(&declared.content, live, &config.ignore_fields);
                if changes.is_empty() {
                    DriftResult::in_sync(declared.id.clone(), now)
                } else {
                    DriftResult::drifted(
                        declared.id.clone(),
                        DriftType::Modified,
                        changes,
                        Some(declared.content.clone()),
                        Some((*live).clone()),
                        now,
                    )
                }
            }
        };
        if result.has_drift {
            tracing::debug!(
                resource = %result.resource,
                drift_type = ?result.drift_type,
                changes = result.changes.len(),
                "drift detected"
            );
        }
        results.push(result);
    }

    for (key, (id, live)) in &actual {
        if desired.contains_key(key) || !severity::is_gitops_managed(live) {
            continue;
        }
        tracing::debug!(resource = %id, "managed resource no longer declared");
        results.push(DriftResult::drifted(
            id.clone(),
            DriftType::Added,
            Vec::new(),
            None,
            Some((*live).clone()),
            now,
        ));
    }

    results
}
