//! Configuration management for keydiff
//!
//! Handles loading and validation of `keydiff.toml` files. Every field has
//! a default, so an absent or empty file yields the built-in setup.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::logging::LogConfig;
use crate::target::REFERENCE_NAME;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-friendly output
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown log format: {s}. Expected one of: pretty, json")),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Tester executable locations for the built-in descriptors
    #[serde(default)]
    pub testers: TestersConfig,

    /// Run controller settings
    #[serde(default)]
    pub run: RunConfig,

    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,

    /// Additional user-defined targets
    #[serde(default)]
    pub targets: Vec<CustomTargetConfig>,
}

/// Built-in tester locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestersConfig {
    #[serde(default = "default_kitty_tester")]
    pub kitty: PathBuf,

    #[serde(default = "default_vte_tester")]
    pub vte: PathBuf,

    #[serde(default = "default_far2l_tester")]
    pub far2l: PathBuf,
}

impl Default for TestersConfig {
    fn default() -> Self {
        Self {
            kitty: default_kitty_tester(),
            vte: default_vte_tester(),
            far2l: default_far2l_tester(),
        }
    }
}

fn default_kitty_tester() -> PathBuf {
    PathBuf::from("./build/bin/kitty_tester")
}

fn default_vte_tester() -> PathBuf {
    PathBuf::from("./build/bin/vte_tester")
}

fn default_far2l_tester() -> PathBuf {
    PathBuf::from("./build/bin/far2l_tester")
}

/// Run controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Hard timeout per tester invocation, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Snapshot the artifacts every N processed cases
    #[serde(default = "default_save_interval")]
    pub save_interval: usize,

    /// Print a progress line every N processed cases
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// Structured results file
    #[serde(default = "default_results_file")]
    pub results_file: PathBuf,

    /// Mismatch report file
    #[serde(default = "default_mismatch_log")]
    pub mismatch_log: PathBuf,

    /// Target diffed against the reference when `--target` is absent
    #[serde(default = "default_target")]
    pub default_target: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            save_interval: default_save_interval(),
            progress_interval: default_progress_interval(),
            results_file: default_results_file(),
            mismatch_log: default_mismatch_log(),
            default_target: default_target(),
        }
    }
}

impl RunConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    2_000
}

fn default_save_interval() -> usize {
    2_000
}

fn default_progress_interval() -> usize {
    500
}

fn default_results_file() -> PathBuf {
    PathBuf::from("test_results.json")
}

fn default_mismatch_log() -> PathBuf {
    PathBuf::from("mismatches.log")
}

fn default_target() -> String {
    "vte".to_string()
}

/// A target declared in the config file rather than compiled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTargetConfig {
    pub name: String,
    pub executable: PathBuf,
    /// Append `--keycode <scan code>` to the invocation
    #[serde(default)]
    pub pass_keycode: bool,
    /// Normalized outputs meaning "not handled by this protocol"
    #[serde(default)]
    pub fallback_markers: Vec<String>,
}

impl Config {
    /// Load configuration from `path`, or the defaults when `None`.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.display().to_string(), e.to_string()))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "run.timeout_ms must be > 0".to_string(),
            ));
        }
        if self.run.save_interval == 0 {
            return Err(ConfigError::ValidationError(
                "run.save_interval must be > 0".to_string(),
            ));
        }
        if self.run.progress_interval == 0 {
            return Err(ConfigError::ValidationError(
                "run.progress_interval must be > 0".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "targets.name must not be empty".to_string(),
                ));
            }
            if target.name == REFERENCE_NAME {
                return Err(ConfigError::ValidationError(format!(
                    "target name '{REFERENCE_NAME}' is reserved for the reference"
                )));
            }
            if !seen.insert(target.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate target name '{}'",
                    target.name
                )));
            }
        }
        Ok(())
    }
}
