use kestrel_core::BoxFuture;
use serde_json::json;

use crate::context::{Collaborators, require};
use crate::error::StageError;
use crate::handler::{StageHandler, StageOutput};
use crate::stage::Stage;

/// Pulls the repository and reports branch, last commit and cleanliness.
///
/// Config: `pull` (default true), `requireClean` (default false).
pub struct GitSync;

impl StageHandler for GitSync {
    fn run<'a>(
        &'a self,
        stage: &'a Stage,
        ctx: &'a Collaborators,
    ) -> BoxFuture<'a, Result<StageOutput, StageError>> {
        Box::pin(async move {
            let vcs = require(&ctx.vcs, "version control")?;

            if stage.config_bool("pull").unwrap_or(true) {
                vcs.pull()
                    .await
                    .map_err(|e| StageError::collaborator("git sync failed", e))?;
            }
            let status = vcs
                .status()
                .await
                .map_err(|e| StageError::collaborator("git status failed", e))?;

            tracing::info!(
                branch = %status.branch,
                commit = %kestrel_core::vcs::short(&status.last_commit),
                clean = status.clean,
                "repository synced"
            );

            let mut output = StageOutput::new(json!({
                "branch": status.branch,
                "lastCommit": status.last_commit,
                "clean": status.clean,
            }));
            if !status.clean {
                if stage.config_bool("requireClean").unwrap_or(false) {
                    return Err(StageError::Failed(
                        "git sync failed: working tree has uncommitted changes".into(),
                    ));
                }
                output
                    .warnings
                    .push("working tree has uncommitted changes".into());
            }
            Ok(output)
        })
    }
}
