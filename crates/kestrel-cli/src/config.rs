use std::path::{Path, PathBuf};

use kestrel_core::PerformanceThresholds;
use kestrel_drift::DriftConfig;
use kestrel_pipeline::PipelineConfig;
use kestrel_rollback::RollbackConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current config version. Bump this when renaming or reshaping sections.
/// Each bump requires a corresponding entry in [`migrate`].
const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KestrelConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    pub config_version: u32,
    pub drift: DriftConfig,
    pub rollback: RollbackConfig,
    pub e2e: PipelineConfig,
    pub performance: PerformanceThresholds,
    pub clusters: Vec<ClusterConfig>,
    pub git: GitConfig,
}

impl Default for KestrelConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_VERSION,
            drift: DriftConfig::default(),
            rollback: RollbackConfig::default(),
            e2e: PipelineConfig::default(),
            performance: PerformanceThresholds::default(),
            clusters: Vec::new(),
            git: GitConfig::default(),
        }
    }
}

impl KestrelConfig {
    pub fn cluster_names(&self) -> Vec<String> {
        self.clusters.iter().map(|c| c.name.clone()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    pub name: String,
    /// edge, regional, central
    #[serde(rename = "type", default)]
    pub cluster_type: String,
    #[serde(default)]
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GitConfig {
    /// Local working tree. `--repo` overrides it.
    pub repository: Option<PathBuf>,
    pub branch: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            repository: None,
            branch: "main".to_string(),
        }
    }
}

/// Load a YAML or JSON config, migrating older layouts first.
pub fn load_config(path: &Path) -> eyre::Result<KestrelConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;

    // Parse to a raw value so migrations run before typed deserialization.
    // serde_yaml also accepts JSON.
    let raw: Value = serde_yaml::from_str(&contents)
        .map_err(|e| eyre::eyre!("failed to parse config at {}: {e}", path.display()))?;
    let raw = if raw.is_null() {
        Value::Object(Default::default())
    } else {
        raw
    };
    let on_disk_version = raw
        .get("configVersion")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;

    let migrated = migrate(raw, on_disk_version)?;
    let config: KestrelConfig = serde_json::from_value(migrated)?;
    tracing::debug!(path = %path.display(), version = config.config_version, "config loaded");
    Ok(config)
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
fn migrate(mut json: Value, from_version: u32) -> eyre::Result<Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "configVersion {from_version} is newer than this build supports ({CURRENT_VERSION})"
        ));
    }

    // v0 → v1: `driftDetection` section renamed to `drift`
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| eyre::eyre!("config is not a mapping"))?;
        if let Some(section) = obj.remove("driftDetection") {
            obj.entry("drift").or_insert(section);
        }
        obj.insert("configVersion".to_string(), Value::Number(1.into()));
        tracing::info!("migrated config v0 → v1 (driftDetection → drift)");
    }

    Ok(json)
}
