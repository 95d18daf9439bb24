use kestrel_core::BoxFuture;

use super::{joined_errors, validate_all};
use crate::context::{Collaborators, require};
use crate::error::StageError;
use crate::handler::{StageHandler, StageOutput};
use crate::stage::Stage;

/// Tears down test resources for `target` (default `cleanup`).
pub struct Cleanup;

impl StageHandler for Cleanup {
    fn run<'a>(
        &'a self,
        stage: &'a Stage,
        ctx: &'a Collaborators,
    ) -> BoxFuture<'a, Result<StageOutput, StageError>> {
        Box::pin(async move {
            let cleanup = require(&ctx.cleanup, "cleanup")?;
            let target = stage.config_str("target").unwrap_or("cleanup").to_string();
            let (output, warnings) = validate_all(cleanup, &[target], |target, report| {
                format!("cleanup of {target} failed: {}", joined_errors(report))
            })
            .await?;
            Ok(StageOutput { output, warnings })
        })
    }
}
