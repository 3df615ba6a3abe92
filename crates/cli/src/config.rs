use anyhow::{Context, Result};
use planlog_core::{ExtractOptions, MarkerLayout, DEFAULT_MARKER_TOKEN};
use planlog_local_store::DEFAULT_ROOT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Optional TOML file passed with `--config`. Only read when named
/// explicitly. The database connection string is not a config key.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PlanlogConfig {
    #[serde(default)]
    pub extract: ExtractSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExtractSettings {
    #[serde(default)]
    pub layout: MarkerLayout,
    #[serde(default = "default_marker")]
    pub marker: String,
    #[serde(default)]
    pub skip_empty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputSettings {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_marker() -> String {
    DEFAULT_MARKER_TOKEN.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_ROOT)
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            layout: MarkerLayout::default(),
            marker: default_marker(),
            skip_empty: false,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

impl PlanlogConfig {
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            layout: self.extract.layout,
            marker_token: self.extract.marker.clone(),
        }
    }
}

/// Load the config file if one was given, defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<PlanlogConfig> {
    let Some(path) = path else {
        return Ok(PlanlogConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    let config: PlanlogConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config at {}", path.display()))?;
    if config.extract.marker.trim().is_empty() {
        anyhow::bail!("extract.marker in {} must not be empty", path.display());
    }
    Ok(config)
}
