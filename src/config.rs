//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.coopcheck.toml` files.

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".coopcheck.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Result store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Simulated analysis timing.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Image upload limits.
    #[serde(default)]
    pub upload: UploadConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Default output format.
    #[serde(default)]
    pub format: OutputFormat,
}

/// Where analyses are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Storage file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Key the analyses are stored under.
    #[serde(default = "default_store_key")]
    pub key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            key: default_store_key(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("coopcheck_store.json")
}

fn default_store_key() -> String {
    crate::store::DEFAULT_STORE_KEY.to_string()
}

/// Simulated analysis timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Milliseconds between progress stages.
    #[serde(default = "default_stage_interval")]
    pub stage_interval_ms: u64,

    /// Milliseconds to wait after storing the result.
    #[serde(default = "default_completion_delay")]
    pub completion_delay_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            stage_interval_ms: default_stage_interval(),
            completion_delay_ms: default_completion_delay(),
        }
    }
}

fn default_stage_interval() -> u64 {
    800
}

fn default_completion_delay() -> u64 {
    1000
}

/// Image upload limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Largest accepted image in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    /// Accepted MIME types.
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_max_bytes() -> u64 {
    crate::upload::DEFAULT_MAX_BYTES
}

fn default_allowed_types() -> Vec<String> {
    vec!["image/jpeg", "image/jpg", "image/png"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence, but only where they were given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref store) = args.store {
            self.store.path = store.clone();
        }
        if let Some(ref key) = args.store_key {
            self.store.key = key.clone();
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(interval) = args.stage_interval_ms() {
            self.analysis.stage_interval_ms = interval;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Effective log level once CLI and file settings are merged.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
