use serde::{Deserialize, Serialize};

use crate::BoxFuture;
use crate::error::CoreError;

/// One entry of repository history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub hash: String,
    pub author: String,
    pub email: String,
    pub date: jiff::Timestamp,
    pub message: String,
    #[serde(default)]
    pub files: Vec<String>,
}

impl Commit {
    /// First eight characters of the hash, for logs.
    pub fn short_hash(&self) -> &str {
        short(&self.hash)
    }

    /// Full-hash match, or abbreviated-hash match on either side.
    pub fn matches(&self, revision: &str) -> bool {
        if revision.is_empty() {
            return false;
        }
        if self.hash == revision {
            return true;
        }
        if revision.len() >= 7 && self.hash.starts_with(revision) {
            return true;
        }
        match (self.hash.get(..8), revision.get(..8)) {
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => false,
        }
    }
}

/// Abbreviate a revision to eight characters (or fewer if it is shorter).
pub fn short(revision: &str) -> &str {
    revision.get(..8).unwrap_or(revision)
}

/// Working tree summary used by the git-sync stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoStatus {
    pub branch: String,
    pub last_commit: String,
    pub clean: bool,
}

/// Version control operations over the declared-state repository.
pub trait VersionControl: Send + Sync {
    fn current_revision(&self) -> BoxFuture<'_, Result<String, CoreError>>;

    /// Most recent first.
    fn history(&self, limit: usize) -> BoxFuture<'_, Result<Vec<Commit>, CoreError>>;

    fn changed_files<'a>(
        &'a self,
        from_rev: &'a str,
        to_rev: &'a str,
    ) -> BoxFuture<'a, Result<Vec<String>, CoreError>>;

    /// File content at a revision. `None` = the file does not exist there.
    fn file_at<'a>(
        &'a self,
        path: &'a str,
        rev: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, CoreError>>;

    fn checkout<'a>(&'a self, rev: &'a str) -> BoxFuture<'a, Result<(), CoreError>>;

    fn reset<'a>(&'a self, rev: &'a str, hard: bool) -> BoxFuture<'a, Result<(), CoreError>>;

    fn create_branch<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), CoreError>>;

    /// Fetch and fast-forward from the tracked remote.
    fn pull(&self) -> BoxFuture<'_, Result<(), CoreError>>;

    fn status(&self) -> BoxFuture<'_, Result<RepoStatus, CoreError>>;
}
