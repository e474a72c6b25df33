use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::tree::ParentCheck;

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Max log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Where the descriptor table comes from
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Adapter registration at startup
    #[serde(default)]
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Schema compiler output; the built-in table when absent
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub parent_check: ParentCheck,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_true")]
    pub builtin_adapters: bool,
    #[serde(default = "default_true")]
    pub freeze: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            builtin_adapters: true,
            freeze: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            schema: SchemaConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file.
    ///
    /// Runs before logging is set up, so it does not log; the caller reports
    /// the load once the subscriber is installed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Parsed log level, `info` if unrecognized
    pub fn level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}
