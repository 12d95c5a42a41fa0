//! TOML Configuration File Support
//!
//! Centralized configuration loading for the oracle, from a TOML file at
//! `~/.config/mystifying-oracle/oracle.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables (`ORACLE_*`, with `OLLAMA_HOST`/`OLLAMA_PORT` as
//!    fallbacks for the backend address)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! - `$XDG_CONFIG_HOME/mystifying-oracle/oracle.toml` (typically
//!   `~/.config/mystifying-oracle/oracle.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [backend]
//! host = "localhost"
//! port = 11434
//! model = "llama3.2"
//! timeout_secs = 120
//!
//! [pacing]
//! move_ms = 800
//! inter_letter_ms = 1200
//! settle_ms = 2000
//!
//! [oracle]
//! scare_chance = 0.05
//! max_history_turns = 40
//!
//! [storage]
//! data_dir = "/home/me/.local/share/mystifying-oracle"
//!
//! [audio]
//! muted = false
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::animation::Pacing;
use crate::conversation::DEFAULT_MAX_TURNS;
use crate::spirit::DEFAULT_CONTEXT_TURNS;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Backend section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendToml {
    /// Model server host
    pub host: Option<String>,
    /// Model server port
    pub port: Option<u16>,
    /// Model used for answers and personas
    pub model: Option<String>,
    /// HTTP request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

/// Pacing section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingToml {
    /// Planchette glide time in milliseconds
    pub move_ms: Option<u64>,
    /// Base delay between spelled letters in milliseconds
    pub inter_letter_ms: Option<u64>,
    /// Emphasis highlight duration in milliseconds
    pub emphasis_ms: Option<u64>,
    /// Settle delay after the last step in milliseconds
    pub settle_ms: Option<u64>,
    /// Delay before returning to rest in milliseconds
    pub return_to_rest_ms: Option<u64>,
}

/// Oracle behavior section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleToml {
    /// Chance (0.0-1.0) that a submission starts a random scare
    pub scare_chance: Option<f64>,
    /// Turns of history kept per persona
    pub max_history_turns: Option<usize>,
    /// Turns of history sent with each question
    pub context_turns: Option<usize>,
    /// Personas offered by the picker
    pub picker_size: Option<usize>,
    /// Disable pacing jitter
    pub steady: Option<bool>,
}

/// Storage section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageToml {
    /// Directory for personas and conversations
    pub data_dir: Option<PathBuf>,
    /// Keep everything in memory
    pub ephemeral: Option<bool>,
}

/// Audio section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioToml {
    /// Start muted
    pub muted: Option<bool>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfigToml {
    /// Backend section
    pub backend: BackendToml,
    /// Pacing section
    pub pacing: PacingToml,
    /// Oracle behavior section
    pub oracle: OracleToml,
    /// Storage section
    pub storage: StorageToml,
    /// Audio section
    pub audio: AudioToml,
}

// =============================================================================
// Resolved Settings
// =============================================================================

/// Where and how to reach the language model
#[derive(Clone, Debug, PartialEq)]
pub struct BackendSettings {
    /// Model server host
    pub host: String,
    /// Model server port
    pub port: u16,
    /// Model used for answers and personas
    pub model: String,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    /// Sampling temperature (`None` = server default)
    pub temperature: Option<f32>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 11434,
            model: "llama3.2".to_string(),
            timeout_secs: 120,
            temperature: None,
        }
    }
}

/// Controller behavior knobs
#[derive(Clone, Debug, PartialEq)]
pub struct OracleSettings {
    /// Chance (0.0-1.0) that a submission starts a random scare
    pub scare_chance: f64,
    /// Turns of history kept per persona
    pub max_history_turns: usize,
    /// Turns of history sent with each question
    pub context_turns: usize,
    /// Personas offered by the picker
    pub picker_size: usize,
    /// Disable pacing jitter
    pub steady: bool,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            scare_chance: 0.05,
            max_history_turns: DEFAULT_MAX_TURNS,
            context_turns: DEFAULT_CONTEXT_TURNS,
            picker_size: 3,
            steady: false,
        }
    }
}

/// Local cache location
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageSettings {
    /// Directory for personas and conversations (`None` = platform default)
    pub data_dir: Option<PathBuf>,
    /// Keep everything in memory
    pub ephemeral: bool,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Centralized configuration for the oracle
///
/// Consolidates all sources and tracks where values came from. Use
/// [`load_config`] to load with proper priority handling.
#[derive(Clone, Debug)]
pub struct OracleConfig {
    /// Language model backend
    pub backend: BackendSettings,
    /// Sequencer timing
    pub pacing: Pacing,
    /// Controller behavior
    pub oracle: OracleSettings,
    /// Local cache
    pub storage: StorageSettings,
    /// Start muted
    pub muted: bool,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    /// Source of configuration values
    source: ConfigSource,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            backend: BackendSettings::default(),
            pacing: Pacing::default(),
            oracle: OracleSettings::default(),
            storage: StorageSettings::default(),
            muted: false,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl OracleConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check values that would make the oracle misbehave
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.oracle.scare_chance) {
            return Err(ConfigError::ValidationError(format!(
                "oracle.scare_chance must be between 0 and 1, got {}",
                self.oracle.scare_chance
            )));
        }
        if self.backend.port == 0 {
            return Err(ConfigError::ValidationError(
                "backend.port must not be 0".to_string(),
            ));
        }
        if self.backend.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "backend.model must not be empty".to_string(),
            ));
        }
        if self.pacing.move_duration.is_zero() {
            return Err(ConfigError::ValidationError(
                "pacing.move_ms must be greater than 0".to_string(),
            ));
        }
        if self.oracle.picker_size == 0 {
            return Err(ConfigError::ValidationError(
                "oracle.picker_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/mystifying-oracle/oracle.toml` or
/// `~/.config/mystifying-oracle/oracle.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("mystifying-oracle").join("oracle.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the merged values fail validation. A missing config file is not an error.
pub fn load_config() -> Result<OracleConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<OracleConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with an explicit environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env(
    path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<OracleConfig, ConfigError> {
    let mut config = OracleConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: OracleConfigToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut OracleConfig, toml: &OracleConfigToml) {
    // Backend
    if let Some(ref host) = toml.backend.host {
        config.backend.host.clone_from(host);
    }
    if let Some(port) = toml.backend.port {
        config.backend.port = port;
    }
    if let Some(ref model) = toml.backend.model {
        config.backend.model.clone_from(model);
    }
    if let Some(timeout) = toml.backend.timeout_secs {
        config.backend.timeout_secs = timeout;
    }
    if toml.backend.temperature.is_some() {
        config.backend.temperature = toml.backend.temperature;
    }

    // Pacing
    let ms = Duration::from_millis;
    if let Some(v) = toml.pacing.move_ms {
        config.pacing.move_duration = ms(v);
    }
    if let Some(v) = toml.pacing.inter_letter_ms {
        config.pacing.inter_letter = ms(v);
    }
    if let Some(v) = toml.pacing.emphasis_ms {
        config.pacing.emphasis = ms(v);
    }
    if let Some(v) = toml.pacing.settle_ms {
        config.pacing.settle = ms(v);
    }
    if let Some(v) = toml.pacing.return_to_rest_ms {
        config.pacing.return_to_rest = ms(v);
    }

    // Oracle
    if let Some(chance) = toml.oracle.scare_chance {
        config.oracle.scare_chance = chance;
    }
    if let Some(turns) = toml.oracle.max_history_turns {
        config.oracle.max_history_turns = turns;
    }
    if let Some(turns) = toml.oracle.context_turns {
        config.oracle.context_turns = turns;
    }
    if let Some(size) = toml.oracle.picker_size {
        config.oracle.picker_size = size;
    }
    if let Some(steady) = toml.oracle.steady {
        config.oracle.steady = steady;
    }

    // Storage
    if toml.storage.data_dir.is_some() {
        config.storage.data_dir.clone_from(&toml.storage.data_dir);
    }
    if let Some(ephemeral) = toml.storage.ephemeral {
        config.storage.ephemeral = ephemeral;
    }

    // Audio
    if let Some(muted) = toml.audio.muted {
        config.muted = muted;
    }
}

fn parse_flag(value: &str) -> bool {
    value != "0" && !value.eq_ignore_ascii_case("false")
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut OracleConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(host) = env("ORACLE_HOST").or_else(|| env("OLLAMA_HOST")) {
        config.backend.host = host;
        config.source = ConfigSource::Env;
    }
    if let Some(port) = env("ORACLE_PORT").or_else(|| env("OLLAMA_PORT")) {
        if let Ok(port) = port.parse::<u16>() {
            config.backend.port = port;
            config.source = ConfigSource::Env;
        }
    }
    if let Some(model) = env("ORACLE_MODEL") {
        config.backend.model = model;
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = env("ORACLE_TIMEOUT_SECS") {
        if let Ok(secs) = timeout.parse::<u64>() {
            config.backend.timeout_secs = secs;
            config.source = ConfigSource::Env;
        }
    }
    if let Some(chance) = env("ORACLE_SCARE_CHANCE") {
        if let Ok(chance) = chance.parse::<f64>() {
            config.oracle.scare_chance = chance;
            config.source = ConfigSource::Env;
        }
    }
    if let Some(dir) = env("ORACLE_DATA_DIR") {
        config.storage.data_dir = Some(PathBuf::from(dir));
        config.source = ConfigSource::Env;
    }
    if let Some(muted) = env("ORACLE_MUTED") {
        config.muted = parse_flag(&muted);
        config.source = ConfigSource::Env;
    }
    if let Some(steady) = env("ORACLE_STEADY") {
        config.oracle.steady = parse_flag(&steady);
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Backend host override
    pub host: Option<String>,
    /// Backend port override
    pub port: Option<u16>,
    /// Model override
    pub model: Option<String>,
    /// Data directory override
    pub data_dir: Option<PathBuf>,
    /// Start muted
    pub muted: Option<bool>,
    /// Disable pacing jitter
    pub steady: Option<bool>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set host override
    #[must_use]
    pub fn with_host(mut self, host: String) -> Self {
        self.host = Some(host);
        self
    }

    /// Set port override
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set model override
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    /// Set data directory override
    #[must_use]
    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.data_dir = Some(dir);
        self
    }

    /// Set muted override
    #[must_use]
    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = Some(muted);
        self
    }

    /// Set steady pacing override
    #[must_use]
    pub fn with_steady(mut self, steady: bool) -> Self {
        self.steady = Some(steady);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut OracleConfig) {
        if self.host.is_some()
            || self.port.is_some()
            || self.model.is_some()
            || self.data_dir.is_some()
            || self.muted.is_some()
            || self.steady.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref host) = self.host {
            config.backend.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.backend.port = port;
        }
        if let Some(ref model) = self.model {
            config.backend.model.clone_from(model);
        }
        if self.data_dir.is_some() {
            config.storage.data_dir.clone_from(&self.data_dir);
        }
        if let Some(muted) = self.muted {
            config.muted = muted;
        }
        if let Some(steady) = self.steady {
            config.oracle.steady = steady;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
