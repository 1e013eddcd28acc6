use anyhow::{Context, Result};
use log::debug;
use schemadiff::Flavor;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "schemadiff.toml";

/// Configuration stored in schemadiff.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemadiffConfig {
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub filter: FilterSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_output_dir")]
    pub dir: String,
    #[serde(default)]
    pub one_file: bool,
    #[serde(default)]
    pub extension: Flavor,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            one_file: false,
            extension: Flavor::default(),
        }
    }
}

fn default_output_dir() -> String {
    "migrations".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Content types to diff; empty means all
    #[serde(default)]
    pub content_types: Vec<String>,
}

impl SchemadiffConfig {
    /// Load an explicitly requested file, or `schemadiff.toml` from the working
    /// directory if present, or fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}
