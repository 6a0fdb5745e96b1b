//! Engine configuration and hierarchy management
//!
//! Precedence, lowest to highest: built-in defaults, TOML file, `VIDOPS_*`
//! environment variables, command-line flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{VidopsError, VidopsResult};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "vidops.toml";

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Engine and toolkit settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// ffmpeg executable used for transforms
    pub ffmpeg_path: String,
    /// ffprobe executable used for metadata
    pub ffprobe_path: String,
    /// External editor invoked as `<editor> <input> <output>`
    pub editor_command: Option<String>,
    /// Upper bound on toolkit invocations running at once
    pub max_concurrent_operations: usize,
    /// Audio filter applied by denoise
    pub denoise_filter: String,
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            editor_command: None,
            max_concurrent_operations: default_concurrency(),
            denoise_filter: "afftdn".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Leave a quarter of the cores to the system, clamp to 1..=8
fn default_concurrency() -> usize {
    let cpu_count = num_cpus::get();
    let optimal = (cpu_count as f64 * 0.75).ceil() as usize;
    optimal.clamp(1, 8)
}

impl EngineConfig {
    /// Parse configuration from TOML text, filling gaps with defaults
    pub fn from_toml_str(content: &str) -> VidopsResult<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_file(path: &Path) -> VidopsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| VidopsError::ConfigError {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve defaults, file, then environment.
    ///
    /// The result is not validated; callers apply command-line overrides first.
    pub fn load(explicit_path: Option<&Path>) -> VidopsResult<Self> {
        let mut config = match explicit_path {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                Self::load_file(path)?
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    info!("Loading configuration from: {}", default_path.display());
                    Self::load_file(&default_path)?
                } else {
                    debug!("No configuration file found, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `VIDOPS_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> VidopsResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut overrides = 0;

        if let Some(value) = lookup("VIDOPS_FFMPEG_PATH") {
            self.ffmpeg_path = value;
            overrides += 1;
        }
        if let Some(value) = lookup("VIDOPS_FFPROBE_PATH") {
            self.ffprobe_path = value;
            overrides += 1;
        }
        if let Some(value) = lookup("VIDOPS_EDITOR") {
            self.editor_command = if value.trim().is_empty() { None } else { Some(value) };
            overrides += 1;
        }
        if let Some(value) = lookup("VIDOPS_MAX_CONCURRENT_OPERATIONS") {
            self.max_concurrent_operations =
                value.trim().parse().map_err(|e| VidopsError::ConfigError {
                    message: format!("Invalid VIDOPS_MAX_CONCURRENT_OPERATIONS '{}': {}", value, e),
                })?;
            overrides += 1;
        }
        if let Some(value) = lookup("VIDOPS_DENOISE_FILTER") {
            self.denoise_filter = value;
            overrides += 1;
        }
        if let Some(value) = lookup("VIDOPS_LOG_LEVEL") {
            self.log_level = value.to_lowercase();
            overrides += 1;
        }
        if let Some(value) = lookup("VIDOPS_JSON_LOGS") {
            self.json_logs = value.trim().parse().map_err(|e| VidopsError::ConfigError {
                message: format!("Invalid VIDOPS_JSON_LOGS '{}': {}", value, e),
            })?;
            overrides += 1;
        }

        if overrides > 0 {
            debug!("Applied {} environment variable overrides", overrides);
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> VidopsResult<()> {
        if self.max_concurrent_operations == 0 {
            return Err(VidopsError::ConfigError {
                message: "max_concurrent_operations must be at least 1".to_string(),
            });
        }
        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(VidopsError::ConfigError {
                message: format!(
                    "Invalid log level: {}. Valid levels: {}",
                    self.log_level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if self.ffmpeg_path.trim().is_empty() || self.ffprobe_path.trim().is_empty() {
            return Err(VidopsError::ConfigError {
                message: "ffmpeg_path and ffprobe_path cannot be empty".to_string(),
            });
        }
        if self.denoise_filter.trim().is_empty() {
            return Err(VidopsError::ConfigError {
                message: "denoise_filter cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}
