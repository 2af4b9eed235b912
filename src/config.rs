//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\comic-minder\config.toml
//! - macOS: ~/Library/Application Support/comic-minder/config.toml
//! - Linux: ~/.config/comic-minder/config.toml
//!
//! The config file is human-readable and editable. It is loaded once at
//! startup and shared read-only by every pipeline run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::metadata::TagOptions;
use crate::organizer::DEFAULT_PATTERN;
use crate::reconciler::PrecedencePolicy;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API credentials (keep separate for potential future encryption)
    pub credentials: Credentials,

    /// Candidate acceptance and provider timeouts
    pub matching: MatchingConfig,

    /// Retry policy for transient provider failures
    pub retry: RetryConfig,

    /// Provider precedence for merging
    pub precedence: PrecedencePolicy,

    /// Batch processing settings
    pub batch: BatchConfig,

    /// What gets written, and where archives end up
    pub output: OutputConfig,
}

/// API credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Comic Vine API key
    pub comicvine_api_key: Option<String>,

    /// Metron account (HTTP basic auth)
    pub metron_username: Option<String>,
    pub metron_password: Option<String>,
}

impl Credentials {
    /// Replace fields with any values given on the command line or in the
    /// environment.
    pub fn with_overrides(mut self, overrides: Credentials) -> Self {
        if overrides.comicvine_api_key.is_some() {
            self.comicvine_api_key = overrides.comicvine_api_key;
        }
        if overrides.metron_username.is_some() {
            self.metron_username = overrides.metron_username;
        }
        if overrides.metron_password.is_some() {
            self.metron_password = overrides.metron_password;
        }
        self
    }
}

/// Matching settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum score (0.0 - 1.0) for a search candidate to be accepted
    pub acceptance_threshold: f32,

    /// Per-provider time budget for one archive, including retries
    pub provider_timeout_secs: u64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.6,
            provider_timeout_secs: 30,
        }
    }
}

/// Retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// First backoff delay; doubled on every retry
    pub backoff_base_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 500,
        }
    }
}

/// Batch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Archives processed concurrently
    pub workers: usize,

    /// Skip archives tagged more recently than this (0 = always re-tag)
    pub recheck_after_days: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            recheck_after_days: 28,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write ComicInfo.xml
    pub comic_info: bool,

    /// Write the ComicMinder.json sidecar
    pub sidecar: bool,

    /// Move archives into the collection layout after tagging
    pub organize: bool,

    /// Naming pattern (see `organizer`)
    pub naming_pattern: String,

    /// Collection root for organized archives (defaults to the scanned path)
    pub collection_root: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            comic_info: true,
            sidecar: true,
            organize: false,
            naming_pattern: DEFAULT_PATTERN.to_string(),
            collection_root: None,
        }
    }
}

impl OutputConfig {
    pub fn tag_options(&self) -> TagOptions {
        TagOptions {
            comic_info: self.comic_info,
            sidecar: self.sidecar,
        }
    }
}

impl Config {
    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.matching.acceptance_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "matching.acceptance_threshold must be between 0 and 1, got {threshold}"
            )));
        }
        if self.matching.provider_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "matching.provider_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.batch.workers == 0 {
            return Err(ConfigError::Invalid(
                "batch.workers must be at least 1".to_string(),
            ));
        }
        if !self.output.comic_info && !self.output.sidecar {
            return Err(ConfigError::Invalid(
                "output.comic_info and output.sidecar cannot both be disabled".to_string(),
            ));
        }
        if self.output.organize && self.output.naming_pattern.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "output.naming_pattern is empty".to_string(),
            ));
        }
        let orders = std::iter::once(&self.precedence.global).chain(self.precedence.per_field.values());
        if orders.flatten().any(|provider| provider.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "precedence lists cannot contain empty provider names".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("comic-minder"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from the default location
///
/// Returns default config if the file doesn't exist or can't be used.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match load_from(&path) {
        Ok(config) => {
            tracing::info!("Loaded config from {:?}", path);
            config
        }
        Err(e) => {
            tracing::error!("{}", e);
            tracing::warn!("Using default configuration");
            Config::default()
        }
    }
}

/// Load and validate configuration from an explicit path
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    let config: Config =
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to the default location
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)?;
    Ok(path)
}

/// Save configuration to an explicit path
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    // Serialize to pretty TOML
    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
