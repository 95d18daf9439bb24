use kestrel_core::BoxFuture;

use super::{joined_errors, validate_all};
use crate::context::{Collaborators, require};
use crate::error::StageError;
use crate::handler::{StageHandler, StageOutput};
use crate::stage::Stage;

/// Runs the named end-to-end suite (`suite`, default the stage name).
pub struct E2eTest;

impl StageHandler for E2eTest {
    fn run<'a>(
        &'a self,
        stage: &'a Stage,
        ctx: &'a Collaborators,
    ) -> BoxFuture<'a, Result<StageOutput, StageError>> {
        Box::pin(async move {
            let validator = require(&ctx.e2e_validator, "e2e validator")?;
            let suite = stage.config_str("suite").unwrap_or(&stage.name).to_string();
            let (output, warnings) = validate_all(validator, &[suite], |suite, report| {
                format!("e2e suite {suite} failed: {}", joined_errors(report))
            })
            .await?;
            Ok(StageOutput { output, warnings })
        })
    }
}
