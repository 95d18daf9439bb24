use std::path::{Path, PathBuf};

use kestrel_core::manifest::{is_manifest_path, parse_documents};
use kestrel_core::{BoxFuture, CoreError, DeclaredResource, ManifestSource};
use walkdir::WalkDir;

/// Declared resources read from a directory of YAML manifests.
#[derive(Debug, Clone)]
pub struct FsManifestSource {
    root: PathBuf,
}

impl FsManifestSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ManifestSource for FsManifestSource {
    fn declared_resources(&self) -> BoxFuture<'_, Result<Vec<DeclaredResource>, CoreError>> {
        let root = self.root.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || scan_tree(&root))
                .await
                .map_err(|e| CoreError::Manifest(format!("manifest scan task failed: {e}")))?
        })
    }
}

/// Walk `root` and parse every manifest file, in file-name order.
///
/// Unreadable files and malformed documents are skipped with a warning.
/// `source_file` is recorded relative to `root`.
pub fn scan_tree(root: &Path) -> Result<Vec<DeclaredResource>, CoreError> {
    if !root.is_dir() {
        return Err(CoreError::Manifest(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut resources = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable manifest path");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        if !is_manifest_path(&relative) {
            continue;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(file = %relative, error = %e, "skipping unreadable manifest");
                continue;
            }
        };
        for (id, content) in parse_documents(&content, &relative) {
            resources.push(DeclaredResource {
                id: id.with_source(relative.clone()),
                content,
            });
        }
    }

    tracing::debug!(root = %root.display(), count = resources.len(), "scanned manifests");
    Ok(resources)
}
