use std::collections::HashMap;
use std::sync::Arc;

use kestrel_core::BoxFuture;
use serde_json::Value;

use crate::context::Collaborators;
use crate::error::StageError;
use crate::stage::{Stage, StageType};
use crate::stages;

/// What a successful stage attempt produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOutput {
    pub output: Value,
    pub warnings: Vec<String>,
}

impl StageOutput {
    pub fn new(output: Value) -> Self {
        Self {
            output,
            warnings: Vec::new(),
        }
    }
}

/// One attempt at a stage. The executor owns timeouts and retries.
pub trait StageHandler: Send + Sync {
    fn run<'a>(
        &'a self,
        stage: &'a Stage,
        ctx: &'a Collaborators,
    ) -> BoxFuture<'a, Result<StageOutput, StageError>>;
}

/// Stage type to handler lookup.
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<StageType, Arc<dyn StageHandler>>,
}

impl HandlerRegistry {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with a handler for every built-in stage type.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for stage_type in StageType::ALL {
            registry.register(stage_type, stages::builtin(stage_type));
        }
        registry
    }

    /// Install or replace the handler for `stage_type`.
    pub fn register(&mut self, stage_type: StageType, handler: Arc<dyn StageHandler>) {
        self.handlers.insert(stage_type, handler);
    }

    pub fn get(&self, stage_type: StageType) -> Option<Arc<dyn StageHandler>> {
        self.handlers.get(&stage_type).cloned()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
