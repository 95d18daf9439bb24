use serde_json::Value;

use kestrel_core::manifest::{is_manifest_path, parse_documents};
use kestrel_core::{CoreError, ResourceIdentifier, VersionControl, format_err_chain};

use crate::state::{RollbackAction, RollbackResource};

/// Compute the resource-level plan that takes the cluster from `current`
/// back to `target`.
///
/// Only manifest files changed between the two revisions are considered.
/// A file that cannot be read at either revision is skipped with a
/// warning; failing to list changed files is an error.
pub async fn plan_rollback(
    vcs: &dyn VersionControl,
    current: &str,
    target: &str,
) -> Result<Vec<RollbackResource>, CoreError> {
    let changed = vcs.changed_files(target, current).await?;
    let mut resources = Vec::new();

    for file in changed.iter().filter(|f| is_manifest_path(f)) {
        let current_docs = match read_resources(vcs, file, current).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(
                    file = %file,
                    error = %format_err_chain(&e),
                    "failed to read current version, skipping"
                );
                continue;
            }
        };
        let target_docs = match read_resources(vcs, file, target).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(
                    file = %file,
                    error = %format_err_chain(&e),
                    "failed to read target version, skipping"
                );
                continue;
            }
        };

        let planned = plan_file(&current_docs, &target_docs);
        tracing::debug!(file = %file, actions = planned.len(), "planned rollback actions");
        resources.extend(planned);
    }

    Ok(resources)
}

async fn read_resources(
    vcs: &dyn VersionControl,
    path: &str,
    rev: &str,
) -> Result<Vec<(ResourceIdentifier, Value)>, CoreError> {
    Ok(vcs
        .file_at(path, rev)
        .await?
        .map(|content| parse_documents(&content, path))
        .unwrap_or_default())
}

/// Match one file's resources across both revisions.
///
/// Present in both: revert to the target version. Only at the current
/// head: delete. Only at the target: create.
pub fn plan_file(
    current: &[(ResourceIdentifier, Value)],
    target: &[(ResourceIdentifier, Value)],
) -> Vec<RollbackResource> {
    let mut planned = Vec::new();

    for (id, doc) in current {
        let matching = target.iter().find(|(t, _)| t.matches(id));
        let mut resource = match matching {
            Some((_, target_doc)) => {
                let mut r = RollbackResource::new(id, RollbackAction::Revert);
                r.previous_state = Some(target_doc.clone());
                r
            }
            None => RollbackResource::new(id, RollbackAction::Delete),
        };
        resource.current_state = Some(doc.clone());
        planned.push(resource);
    }

    for (id, doc) in target {
        if current.iter().any(|(c, _)| c.matches(id)) {
            continue;
        }
        let mut resource = RollbackResource::new(id, RollbackAction::Create);
        resource.previous_state = Some(doc.clone());
        planned.push(resource);
    }

    planned
}

/// Stable sort into execution order.
pub fn order_for_execution(resources: &mut [RollbackResource]) {
    resources.sort_by_key(|r| r.action.priority());
}
