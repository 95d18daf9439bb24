use std::path::{Path, PathBuf};
use std::process::Output;

use jiff::Timestamp;
use kestrel_core::{BoxFuture, Commit, CoreError, RepoStatus, VersionControl};
use tokio::process::Command;

const RECORD_SEPARATOR: char = '\u{1e}';
const FIELD_SEPARATOR: char = '\u{1f}';
/// `%x1e` starts each record so `--name-only` file lists stay attached to
/// their commit.
const LOG_FORMAT: &str = "--pretty=format:%x1e%H%x1f%an%x1f%ae%x1f%aI%x1f%s";

/// [`VersionControl`] backed by the `git` binary in a working tree.
///
/// Child processes are killed when the calling future is dropped, so a
/// deadline on the caller cancels the subprocess too.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo: PathBuf,
    program: String,
}

impl GitCli {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            program: "git".to_string(),
        }
    }

    /// Use a different git executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    async fn output(&self, args: &[&str]) -> Result<Output, CoreError> {
        tracing::debug!(args = ?args, repo = %self.repo.display(), "running git");
        Command::new(&self.program)
            .args(args)
            .current_dir(&self.repo)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CoreError::Vcs(format!("failed to run {}: {e}", self.program)))
    }

    /// Run git and return stdout, failing on a non-zero exit.
    async fn git(&self, args: &[&str]) -> Result<String, CoreError> {
        let output = self.output(args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreError::Vcs(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or_default(),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VersionControl for GitCli {
    fn current_revision(&self) -> BoxFuture<'_, Result<String, CoreError>> {
        Box::pin(async move {
            let head = self.git(&["rev-parse", "HEAD"]).await?;
            Ok(head.trim().to_string())
        })
    }

    fn history(&self, limit: usize) -> BoxFuture<'_, Result<Vec<Commit>, CoreError>> {
        Box::pin(async move {
            let count = format!("-n{limit}");
            let log = self.git(&["log", &count, LOG_FORMAT, "--name-only"]).await?;
            parse_log(&log)
        })
    }

    fn changed_files<'a>(
        &'a self,
        from_rev: &'a str,
        to_rev: &'a str,
    ) -> BoxFuture<'a, Result<Vec<String>, CoreError>> {
        Box::pin(async move {
            let diff = self.git(&["diff", "--name-only", from_rev, to_rev]).await?;
            Ok(diff
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect())
        })
    }

    fn file_at<'a>(
        &'a self,
        path: &'a str,
        rev: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, CoreError>> {
        Box::pin(async move {
            let object = format!("{rev}:{path}");
            let exists = self.output(&["cat-file", "-e", &object]).await?;
            if !exists.status.success() {
                return Ok(None);
            }
            self.git(&["show", &object]).await.map(Some)
        })
    }

    fn checkout<'a>(&'a self, rev: &'a str) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move { self.git(&["checkout", rev]).await.map(drop) })
    }

    fn reset<'a>(&'a self, rev: &'a str, hard: bool) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move {
            let mode = if hard { "--hard" } else { "--mixed" };
            self.git(&["reset", mode, rev]).await.map(drop)
        })
    }

    fn create_branch<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move { self.git(&["branch", name]).await.map(drop) })
    }

    fn pull(&self) -> BoxFuture<'_, Result<(), CoreError>> {
        Box::pin(async move { self.git(&["pull", "--ff-only"]).await.map(drop) })
    }

    fn status(&self) -> BoxFuture<'_, Result<RepoStatus, CoreError>> {
        Box::pin(async move {
            let branch = self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
            let last_commit = self.git(&["rev-parse", "HEAD"]).await?;
            let porcelain = self.git(&["status", "--porcelain"]).await?;
            Ok(RepoStatus {
                branch: branch.trim().to_string(),
                last_commit: last_commit.trim().to_string(),
                clean: porcelain.trim().is_empty(),
            })
        })
    }
}

/// Parse `git log` output produced with [`LOG_FORMAT`] and `--name-only`.
pub fn parse_log(log: &str) -> Result<Vec<Commit>, CoreError> {
    let mut commits = Vec::new();

    for record in log.split(RECORD_SEPARATOR) {
        let mut lines = record.lines();
        let Some(header) = lines.next().filter(|h| !h.trim().is_empty()) else {
            continue;
        };

        let fields: Vec<&str> = header.split(FIELD_SEPARATOR).collect();
        let [hash, author, email, date, message] = fields.as_slice() else {
            return Err(CoreError::Vcs(format!("unexpected git log line: {header}")));
        };
        let date: Timestamp = date
            .parse()
            .map_err(|e| CoreError::Vcs(format!("bad commit date {date}: {e}")))?;

        commits.push(Commit {
            hash: hash.to_string(),
            author: author.to_string(),
            email: email.to_string(),
            date,
            message: message.to_string(),
            files: lines
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
        });
    }

    Ok(commits)
}
