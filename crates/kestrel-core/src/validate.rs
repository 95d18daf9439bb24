use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::BoxFuture;
use crate::error::CoreError;

/// Business-level outcome of a validation. A failed validation is a result,
/// not an error: `Err` is reserved for being unable to validate at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub target: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

impl ValidationReport {
    pub fn passed(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            success: true,
            ..Self::default()
        }
    }

    pub fn failed(target: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            target: target.into(),
            success: false,
            errors,
            ..Self::default()
        }
    }
}

/// A readiness / sync / package check against a named target
/// (cluster, package path, application).
pub trait Validator: Send + Sync {
    fn validate<'a>(&'a self, target: &'a str)
    -> BoxFuture<'a, Result<ValidationReport, CoreError>>;
}
