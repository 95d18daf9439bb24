use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageType {
    GitSync,
    PackageValidation,
    PackageSync,
    Deployment,
    HealthCheck,
    PerformanceTest,
    E2eTest,
    DriftCheck,
    Cleanup,
}

impl StageType {
    pub const ALL: [StageType; 9] = [
        Self::GitSync,
        Self::PackageValidation,
        Self::PackageSync,
        Self::Deployment,
        Self::HealthCheck,
        Self::PerformanceTest,
        Self::E2eTest,
        Self::DriftCheck,
        Self::Cleanup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitSync => "git-sync",
            Self::PackageValidation => "package-validation",
            Self::PackageSync => "package-sync",
            Self::Deployment => "deployment",
            Self::HealthCheck => "health-check",
            Self::PerformanceTest => "performance-test",
            Self::E2eTest => "e2e-test",
            Self::DriftCheck => "drift-check",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for StageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a pipeline does when a stage fails hard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStrategy {
    /// Halt the run.
    #[default]
    Stop,
    /// Record the failure, skip its dependents, keep scheduling.
    Continue,
    /// Halt, then ask the rollback trigger whether to roll back.
    Rollback,
}

/// One declared unit of work. Read-only during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub name: String,
    #[serde(rename = "type")]
    pub stage_type: StageType,
    #[serde(default, with = "kestrel_core::duration::option")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub continue_on_failure: bool,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl Stage {
    pub fn new(name: impl Into<String>, stage_type: StageType) -> Self {
        Self {
            name: name.into(),
            stage_type,
            timeout: None,
            retry_count: 0,
            dependencies: Vec::new(),
            parallel: false,
            continue_on_failure: false,
            config: Map::new(),
        }
    }

    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn allow_failure(mut self) -> Self {
        self.continue_on_failure = true;
        self
    }

    pub fn with_config(mut self, key: &str, value: Value) -> Self {
        self.config.insert(key.to_string(), value);
        self
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key)?.as_str()
    }

    pub fn config_bool(&self, key: &str) -> Option<bool> {
        self.config.get(key)?.as_bool()
    }

    /// A list of strings, also accepting a single string.
    pub fn config_strings(&self, key: &str) -> Option<Vec<String>> {
        match self.config.get(key)? {
            Value::String(s) => Some(vec![s.clone()]),
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(String::from))
                    .collect(),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn deserializes_declared_stage() {
        let stage: Stage = serde_json::from_value(json!({
            "name": "validate-packages",
            "type": "package-validation",
            "timeout": "5m",
            "retryCount": 2,
            "dependencies": ["sync"],
            "parallel": true,
            "config": {"packages": ["ran/du", "ran/cu"]}
        }))
        .unwrap();

        assert_eq!(stage.stage_type, StageType::PackageValidation);
        assert_eq!(stage.timeout, Some(Duration::from_secs(300)));
        assert_eq!(stage.retry_count, 2);
        assert!(!stage.continue_on_failure);
        assert_eq!(
            stage.config_strings("packages"),
            Some(vec!["ran/du".to_string(), "ran/cu".to_string()])
        );
    }

    #[test]
    fn single_string_reads_as_list() {
        let stage =
            Stage::new("deploy", StageType::Deployment).with_config("clusters", json!("edge01"));
        assert_eq!(stage.config_strings("clusters"), Some(vec!["edge01".to_string()]));
        assert_eq!(stage.config_strings("missing"), None);
    }

    #[test]
    fn stage_types_round_trip_kebab_case() {
        for stage_type in StageType::ALL {
            let value = serde_json::to_value(stage_type).unwrap();
            assert_eq!(value, stage_type.as_str());
        }
    }
}
