use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunables for the waveform cache and acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Pixels resident on either side of the most recently requested index.
    pub window_half_span: usize,
    /// Available zoom levels in samples per pixel, finest first.
    pub zoom_levels: Vec<u32>,
    /// Send cookies/credentials with remote requests.
    pub with_credentials: bool,
    /// Request binary payloads when the platform can receive them.
    pub prefer_binary: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_half_span: 2000,
            zoom_levels: vec![512, 1024, 2048, 4096],
            with_credentials: false,
            prefer_binary: true,
        }
    }
}

/// Allowed range for `window_half_span`.
pub const WINDOW_HALF_SPAN_RANGE: (usize, usize) = (64, 1_000_000);

/// Persisted configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    pub config: ViewerConfig,
}

/// Loads, validates and persists a [`ViewerConfig`] as JSON.
///
/// Defaults to `peakview.json` in the current working directory.
pub struct ConfigManager {
    config_path: PathBuf,
    config: ViewerConfig,
}

impl ConfigManager {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from("peakview.json"));

        Self {
            config_path,
            config: ViewerConfig::default(),
        }
    }

    /// Load configuration from disk, writing defaults if the file is missing.
    pub fn load(&mut self) -> Result<ViewerConfig, ConfigError> {
        if !self.config_path.exists() {
            self.save()?;
            return Ok(self.config.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::Read(e.to_string()))?;

        let config_file: ConfigFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if config_file.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "Config file version {} doesn't match library version {}, missing settings use defaults",
                config_file.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        Self::validate(&config_file.config).map_err(ConfigError::Validation)?;

        self.config = config_file.config;
        Ok(self.config.clone())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::Write(e.to_string()))?;
            }
        }

        let config_file = ConfigFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            config: self.config.clone(),
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(&self.config_path, content).map_err(|e| ConfigError::Write(e.to_string()))?;

        Ok(())
    }

    /// Validate, replace and persist the configuration.
    pub fn update_config(&mut self, config: ViewerConfig) -> Result<(), ConfigError> {
        Self::validate(&config).map_err(ConfigError::Validation)?;
        self.config = config;
        self.save()
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Check a configuration, collecting every problem found.
    pub fn validate(config: &ViewerConfig) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let (min, max) = WINDOW_HALF_SPAN_RANGE;
        if config.window_half_span < min || config.window_half_span > max {
            errors.push(format!("window_half_span must be between {} and {}", min, max));
        }

        if config.zoom_levels.is_empty() {
            errors.push("zoom_levels must not be empty".to_string());
        }
        if config.zoom_levels.contains(&0) {
            errors.push("zoom_levels must be positive".to_string());
        }
        if config.zoom_levels.windows(2).any(|w| w[0] >= w[1]) {
            errors.push("zoom_levels must be in ascending order".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.config = ViewerConfig::default();
        self.save()
    }
}

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(String),
    #[error("Failed to write config file: {0}")]
    Write(String),
    #[error("Failed to parse config file: {0}")]
    Parse(String),
    #[error("Failed to serialize config: {0}")]
    Serialize(String),
    #[error("Config validation errors: {}", .0.join(", "))]
    Validation(Vec<String>),
}
