use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use serde_json::Value;
use tokio::time::Instant;
use tracing::Instrument;

use crate::context::Collaborators;
use crate::error::StageError;
use crate::handler::{HandlerRegistry, StageOutput};
use crate::result::StageResult;
use crate::stage::Stage;

/// Runs one stage with its timeout and retry policy.
///
/// Cheap to clone so parallel groups can hand a copy to each task.
#[derive(Clone)]
pub struct StageExecutor {
    registry: Arc<HandlerRegistry>,
    collaborators: Arc<Collaborators>,
    retry_delay: Duration,
    /// Pipeline-wide deadline; caps every stage deadline and backoff.
    deadline: Option<Instant>,
}

impl StageExecutor {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        collaborators: Arc<Collaborators>,
        retry_delay: Duration,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            registry,
            collaborators,
            retry_delay,
            deadline,
        }
    }

    pub async fn execute(&self, stage: &Stage) -> StageResult {
        let span = tracing::info_span!(
            "stage",
            stage = %stage.name,
            stage_type = %stage.stage_type,
        );
        self.execute_inner(stage).instrument(span).await
    }

    async fn execute_inner(&self, stage: &Stage) -> StageResult {
        let start_time = Timestamp::now();
        let started = Instant::now();
        tracing::info!("stage started");

        // One deadline covers every attempt and the backoff between them.
        let deadline = Deadline::new(stage.timeout.map(|t| started + t), self.deadline);

        let mut retry_count = 0;
        let mut outcome = Err(StageError::NoHandler(stage.stage_type.to_string()));

        if self.registry.get(stage.stage_type).is_some() {
            for attempt in 0..=stage.retry_count {
                if attempt > 0 {
                    if let Err(e) = self.backoff(attempt, &deadline, stage).await {
                        outcome = Err(e);
                        break;
                    }
                    tracing::info!(attempt, "retrying stage");
                }
                retry_count = attempt;
                outcome = self.attempt(stage, &deadline).await;
                match &outcome {
                    Ok(_) => break,
                    Err(e) if e.is_cancellation() => {
                        tracing::warn!(error = %e, "stage cancelled, not retrying");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(attempt, error = %e, "stage attempt failed");
                    }
                }
            }
        }

        let duration = started.elapsed();
        let mut result = StageResult {
            stage: stage.name.clone(),
            stage_type: stage.stage_type,
            start_time,
            end_time: Timestamp::now(),
            duration,
            success: false,
            skipped: false,
            errors: Vec::new(),
            warnings: Vec::new(),
            retry_count,
            output: Value::Null,
        };
        match outcome {
            Ok(StageOutput { output, warnings }) => {
                tracing::info!(
                    duration_ms = duration.as_millis() as u64,
                    retry_count,
                    "stage succeeded"
                );
                result.success = true;
                result.output = output;
                result.warnings = warnings;
            }
            Err(e) => {
                tracing::warn!(error = %e, retry_count, "stage failed");
                result.errors.push(e.to_string());
            }
        }
        result
    }

    /// One handler call bounded by the stage deadline.
    async fn attempt(
        &self,
        stage: &Stage,
        deadline: &Deadline,
    ) -> Result<StageOutput, StageError> {
        let handler = self
            .registry
            .get(stage.stage_type)
            .ok_or_else(|| StageError::NoHandler(stage.stage_type.to_string()))?;
        let call = handler.run(stage, &self.collaborators);

        let Some(at) = deadline.at() else {
            return call.await;
        };
        match tokio::time::timeout_at(at, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(deadline.expired(stage)),
        }
    }

    /// Linear backoff before retry `attempt`. Fails instead of sleeping
    /// past the stage deadline.
    async fn backoff(
        &self,
        attempt: u32,
        deadline: &Deadline,
        stage: &Stage,
    ) -> Result<(), StageError> {
        let wake = Instant::now() + self.retry_delay * attempt;
        match deadline.at() {
            Some(at) if at <= wake => {
                tokio::time::sleep_until(at).await;
                Err(deadline.expired(stage))
            }
            _ => {
                tokio::time::sleep_until(wake).await;
                Ok(())
            }
        }
    }
}

/// The tighter of a stage's own timeout and the pipeline deadline.
struct Deadline {
    stage: Option<Instant>,
    pipeline: Option<Instant>,
}

impl Deadline {
    fn new(stage: Option<Instant>, pipeline: Option<Instant>) -> Self {
        Self { stage, pipeline }
    }

    fn at(&self) -> Option<Instant> {
        match (self.stage, self.pipeline) {
            (Some(s), Some(p)) => Some(s.min(p)),
            (s, p) => s.or(p),
        }
    }

    /// Error for a deadline that fired: `Timeout` when the stage's own
    /// timeout was the binding one.
    fn expired(&self, stage: &Stage) -> StageError {
        match (self.stage, self.pipeline) {
            (Some(s), Some(p)) if p < s => StageError::Cancelled(
                "pipeline exceeded its maximum duration".into(),
            ),
            (Some(_), _) => StageError::Timeout {
                after: stage.timeout.unwrap_or_default(),
            },
            (None, _) => StageError::Cancelled(
                "pipeline exceeded its maximum duration".into(),
            ),
        }
    }
}
