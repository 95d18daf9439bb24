use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::BoxFuture;
use crate::error::CoreError;
use crate::resource::ResourceIdentifier;

/// Path fragments that never hold deployable manifests.
const NON_MANIFEST_DIRS: &[&str] = &[".git/", "docs/", "scripts/", "tests/"];

/// A resource document declared in version control, tagged with its origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredResource {
    pub id: ResourceIdentifier,
    pub content: Value,
}

/// Enumerates the declared (desired) resources from a file tree.
pub trait ManifestSource: Send + Sync {
    /// Every declared resource. Malformed documents are skipped with a
    /// warning; failing to read the tree at all is an error.
    fn declared_resources(&self) -> BoxFuture<'_, Result<Vec<DeclaredResource>, CoreError>>;
}

/// True for `.yaml` / `.yml` files.
pub fn is_yaml_path(path: &str) -> bool {
    path.ends_with(".yaml") || path.ends_with(".yml")
}

/// True for YAML files outside documentation, script and test directories.
pub fn is_manifest_path(path: &str) -> bool {
    if !is_yaml_path(path) {
        return false;
    }
    let normalized = format!("/{}", path.trim_start_matches("./"));
    !NON_MANIFEST_DIRS
        .iter()
        .any(|dir| normalized.contains(&format!("/{dir}")))
}

/// Split a YAML stream into documents on `---` separator lines.
///
/// A separator may carry the start of the next document on the same line
/// (`--- apiVersion: v1`, `--- !tag`); a trailing comment is dropped. A
/// `...` line ends the current document.
fn split_documents(content: &str) -> Vec<String> {
    let mut docs = Vec::new();
    let mut current = String::new();

    for line in content.lines() {
        let trimmed = line.trim_end();
        if trimmed == "..." {
            docs.push(std::mem::take(&mut current));
            continue;
        }
        let Some(rest) = trimmed.strip_prefix("---") else {
            current.push_str(line);
            current.push('\n');
            continue;
        };
        if !(rest.is_empty() || rest.starts_with([' ', '\t'])) {
            // `----` or `---foo` is content, not a marker.
            current.push_str(line);
            current.push('\n');
            continue;
        }

        docs.push(std::mem::take(&mut current));
        let inline = rest.trim_start();
        if !inline.is_empty() && !inline.starts_with('#') {
            current.push_str(inline);
            current.push('\n');
        }
    }
    docs.push(current);

    docs.into_iter()
        .filter(|doc| !doc.trim().is_empty())
        .collect()
}

/// Parse one-or-many YAML documents into resource documents.
///
/// Documents that fail to parse, or that lack `apiVersion`/`kind`, are
/// skipped with a warning rather than failing the whole file.
pub fn parse_documents(content: &str, origin: &str) -> Vec<(ResourceIdentifier, Value)> {
    let mut resources = Vec::new();

    for (index, doc) in split_documents(content).iter().enumerate() {
        let value: Value = match serde_yaml::from_str(doc) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    origin = %origin,
                    document = index,
                    error = %e,
                    "skipping malformed manifest document"
                );
                continue;
            }
        };

        if value.is_null() {
            continue;
        }

        match ResourceIdentifier::from_document(&value) {
            Some(id) => resources.push((id, value)),
            None => {
                tracing::warn!(
                    origin = %origin,
                    document = index,
                    "skipping document without apiVersion/kind"
                );
            }
        }
    }

    resources
}
