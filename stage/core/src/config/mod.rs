//! TOML Configuration File Support
//!
//! Configuration for the stage lives in `~/.config/sprite-stage/stage.toml`.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! - `$XDG_CONFIG_HOME/sprite-stage/stage.toml` (typically `~/.config/sprite-stage/stage.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [playback]
//! step_delay_ms = 500
//! transient_message_ms = 1000
//! random_extent = 200.0
//! concurrent_play = "reject"   # or "ignore"
//! swap_scope = "full"          # or "pending"
//! random_seed = 42
//!
//! [stage]
//! default_cast = true
//! event_buffer = 256
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `STAGE_STEP_DELAY_MS` | `playback.step_delay` |
//! | `STAGE_TRANSIENT_MS` | `playback.transient_message_duration` |
//! | `STAGE_RANDOM_EXTENT` | `playback.random_extent` |
//! | `STAGE_CONCURRENT_PLAY` | `playback.concurrent_play` |
//! | `STAGE_SWAP_SCOPE` | `playback.swap_scope` |

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::playback::{ConcurrentPlayPolicy, PlaybackConfig, SwapScope};

/// Default capacity of the stage event channel
pub const DEFAULT_EVENT_BUFFER: usize = 256;

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

/// Playback section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackToml {
    /// Pause after each step in milliseconds
    pub step_delay_ms: Option<u64>,

    /// Lifetime of "Say Hello for 1 sec" in milliseconds
    pub transient_message_ms: Option<u64>,

    /// Exclusive upper bound for "Go to random position"
    pub random_extent: Option<f64>,

    /// `"reject"` or `"ignore"`
    pub concurrent_play: Option<ConcurrentPlayPolicy>,

    /// `"full"` or `"pending"`
    pub swap_scope: Option<SwapScope>,

    /// Seed for reproducible random placement
    pub random_seed: Option<u64>,
}

/// Stage section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StageToml {
    /// Start with the Cat / Dog / Penguin cast
    pub default_cast: Option<bool>,

    /// Capacity of the event channel
    pub event_buffer: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfigToml {
    /// Playback configuration section
    pub playback: PlaybackToml,

    /// Stage configuration section
    pub stage: StageToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Loaded stage configuration
///
/// Use [`load_config`] to load it with proper priority handling.
#[derive(Clone, Debug)]
pub struct StageConfigFile {
    /// Playback configuration
    pub playback: PlaybackConfig,

    /// Start with the default cast
    pub default_cast: bool,

    /// Capacity of the event channel
    pub event_buffer: usize,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for StageConfigFile {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            default_cast: true,
            event_buffer: DEFAULT_EVENT_BUFFER,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl StageConfigFile {
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

    /// Check values that would break playback
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a non-positive or
    /// non-finite random extent, or a zero event buffer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let extent = self.playback.random_extent;
        if !extent.is_finite() || extent <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "random_extent must be a positive number, got {extent}"
            )));
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "event_buffer must be at least 1".to_string(),
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
/// Returns `$XDG_CONFIG_HOME/sprite-stage/stage.toml` or
/// `~/.config/sprite-stage/stage.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sprite-stage").join("stage.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the merged values fail validation. A missing config file is not an error.
pub fn load_config() -> Result<StageConfigFile, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or if the merged values fail validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<StageConfigFile, ConfigError> {
    let mut config = StageConfigFile::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: StageConfigToml = toml::from_str(&toml_content)?;
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

    apply_env_config(&mut config, |key| std::env::var(key).ok());

    config.validate()?;
    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut StageConfigFile, toml: &StageConfigToml) {
    let playback = &mut config.playback;
    if let Some(ms) = toml.playback.step_delay_ms {
        playback.step_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.playback.transient_message_ms {
        playback.transient_message_duration = Duration::from_millis(ms);
    }
    if let Some(extent) = toml.playback.random_extent {
        playback.random_extent = extent;
    }
    if let Some(policy) = toml.playback.concurrent_play {
        playback.concurrent_play = policy;
    }
    if let Some(scope) = toml.playback.swap_scope {
        playback.swap_scope = scope;
    }
    if toml.playback.random_seed.is_some() {
        playback.random_seed = toml.playback.random_seed;
    }

    if let Some(cast) = toml.stage.default_cast {
        config.default_cast = cast;
    }
    if let Some(buffer) = toml.stage.event_buffer {
        config.event_buffer = buffer;
    }
}

/// Apply environment variable overrides to the config
///
/// `lookup` resolves a variable name; production passes `std::env::var`.
fn apply_env_config<F>(config: &mut StageConfigFile, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(delay) = lookup("STAGE_STEP_DELAY_MS") {
        match delay.trim().parse::<u64>() {
            Ok(ms) => {
                config.playback.step_delay = Duration::from_millis(ms);
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %delay, "Ignoring invalid STAGE_STEP_DELAY_MS"),
        }
    }
    if let Some(window) = lookup("STAGE_TRANSIENT_MS") {
        match window.trim().parse::<u64>() {
            Ok(ms) => {
                config.playback.transient_message_duration = Duration::from_millis(ms);
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %window, "Ignoring invalid STAGE_TRANSIENT_MS"),
        }
    }
    if let Some(extent) = lookup("STAGE_RANDOM_EXTENT") {
        match extent.trim().parse::<f64>() {
            Ok(e) => {
                config.playback.random_extent = e;
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %extent, "Ignoring invalid STAGE_RANDOM_EXTENT"),
        }
    }
    if let Some(policy) = lookup("STAGE_CONCURRENT_PLAY") {
        match ConcurrentPlayPolicy::parse(&policy) {
            Some(p) => {
                config.playback.concurrent_play = p;
                config.source = ConfigSource::Env;
            }
            None => tracing::warn!(value = %policy, "Ignoring invalid STAGE_CONCURRENT_PLAY"),
        }
    }
    if let Some(scope) = lookup("STAGE_SWAP_SCOPE") {
        match SwapScope::parse(&scope) {
            Some(s) => {
                config.playback.swap_scope = s;
                config.source = ConfigSource::Env;
            }
            None => tracing::warn!(value = %scope, "Ignoring invalid STAGE_SWAP_SCOPE"),
        }
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
    /// Step delay override (milliseconds)
    pub step_delay_ms: Option<u64>,

    /// Transient message window override (milliseconds)
    pub transient_message_ms: Option<u64>,

    /// Concurrent play policy override
    pub concurrent_play: Option<ConcurrentPlayPolicy>,

    /// Swap scope override
    pub swap_scope: Option<SwapScope>,

    /// Random seed override
    pub random_seed: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set step delay override
    #[must_use]
    pub fn with_step_delay_ms(mut self, ms: u64) -> Self {
        self.step_delay_ms = Some(ms);
        self
    }

    /// Set transient message window override
    #[must_use]
    pub fn with_transient_message_ms(mut self, ms: u64) -> Self {
        self.transient_message_ms = Some(ms);
        self
    }

    /// Set concurrent play policy override
    #[must_use]
    pub fn with_concurrent_play(mut self, policy: ConcurrentPlayPolicy) -> Self {
        self.concurrent_play = Some(policy);
        self
    }

    /// Set swap scope override
    #[must_use]
    pub fn with_swap_scope(mut self, scope: SwapScope) -> Self {
        self.swap_scope = Some(scope);
        self
    }

    /// Set random seed override
    #[must_use]
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Whether any override is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.step_delay_ms.is_none()
            && self.transient_message_ms.is_none()
            && self.concurrent_play.is_none()
            && self.swap_scope.is_none()
            && self.random_seed.is_none()
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut StageConfigFile) {
        if !self.is_empty() {
            config.source = ConfigSource::Cli;
        }

        if let Some(ms) = self.step_delay_ms {
            config.playback.step_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.transient_message_ms {
            config.playback.transient_message_duration = Duration::from_millis(ms);
        }
        if let Some(policy) = self.concurrent_play {
            config.playback.concurrent_play = policy;
        }
        if let Some(scope) = self.swap_scope {
            config.playback.swap_scope = scope;
        }
        if self.random_seed.is_some() {
            config.playback.random_seed = self.random_seed;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    // =========================================================================
    // Default Configuration Tests
    // =========================================================================

    #[test]
    fn test_default_config() {
        let config = StageConfigFile::default();

        assert_eq!(config.playback.step_delay, Duration::from_millis(500));
        assert_eq!(
            config.playback.transient_message_duration,
            Duration::from_millis(1000)
        );
        assert_eq!(config.playback.random_extent, 200.0);
        assert!(config.default_cast);
        assert_eq!(config.event_buffer, DEFAULT_EVENT_BUFFER);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.to_string_lossy().contains("sprite-stage"));
            assert!(p.to_string_lossy().ends_with("stage.toml"));
        }
    }

    // =========================================================================
    // TOML Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_valid_toml() {
        let file = write_config(
            r#"
[playback]
step_delay_ms = 250
transient_message_ms = 2000
random_extent = 400.0
concurrent_play = "ignore"
swap_scope = "pending"
random_seed = 7

[stage]
default_cast = false
event_buffer = 16
"#,
        );

        let config = load_config_from_path(Some(file.path().to_path_buf())).unwrap();

        assert_eq!(config.playback.step_delay, Duration::from_millis(250));
        assert_eq!(
            config.playback.transient_message_duration,
            Duration::from_millis(2000)
        );
        assert_eq!(config.playback.random_extent, 400.0);
        assert_eq!(config.playback.concurrent_play, ConcurrentPlayPolicy::Ignore);
        assert_eq!(config.playback.swap_scope, SwapScope::Pending);
        assert_eq!(config.playback.random_seed, Some(7));
        assert!(!config.default_cast);
        assert_eq!(config.event_buffer, 16);
        assert_eq!(config.config_file_path, Some(file.path().to_path_buf()));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let file = write_config("[playback]\nstep_delay_ms = 100\n");
        let config = load_config_from_path(Some(file.path().to_path_buf())).unwrap();

        assert_eq!(config.playback.step_delay, Duration::from_millis(100));
        assert_eq!(
            config.playback.transient_message_duration,
            Duration::from_millis(1000)
        );
        assert!(config.default_cast);
    }

    #[test]
    fn test_invalid_toml() {
        let file = write_config("[playback\nstep_delay_ms = ");
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_wrong_policy_name_is_parse_error() {
        let file = write_config("[playback]\nconcurrent_play = \"queue\"\n");
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            load_config_from_path(Some(PathBuf::from("/nonexistent/sprite-stage.toml"))).unwrap();
        assert!(config.config_file_path.is_none());
        assert!(config.default_cast);
    }

    #[test]
    fn test_non_positive_extent_rejected() {
        let file = write_config("[playback]\nrandom_extent = 0.0\n");
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    // =========================================================================
    // Environment Variable Tests
    // =========================================================================

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = StageConfigFile::default();
        apply_toml_config(
            &mut config,
            &toml::from_str("[playback]\nstep_delay_ms = 250\n").unwrap(),
        );

        apply_env_config(
            &mut config,
            env_from(&[
                ("STAGE_STEP_DELAY_MS", "10"),
                ("STAGE_TRANSIENT_MS", "20"),
                ("STAGE_RANDOM_EXTENT", "50"),
                ("STAGE_CONCURRENT_PLAY", "Ignore"),
                ("STAGE_SWAP_SCOPE", "pending"),
            ]),
        );

        assert_eq!(config.playback.step_delay, Duration::from_millis(10));
        assert_eq!(
            config.playback.transient_message_duration,
            Duration::from_millis(20)
        );
        assert_eq!(config.playback.random_extent, 50.0);
        assert_eq!(config.playback.concurrent_play, ConcurrentPlayPolicy::Ignore);
        assert_eq!(config.playback.swap_scope, SwapScope::Pending);
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_invalid_env_values_ignored() {
        let mut config = StageConfigFile::default();
        apply_env_config(
            &mut config,
            env_from(&[
                ("STAGE_STEP_DELAY_MS", "soon"),
                ("STAGE_CONCURRENT_PLAY", "sometimes"),
            ]),
        );

        assert_eq!(config.playback.step_delay, Duration::from_millis(500));
        assert_eq!(config.playback.concurrent_play, ConcurrentPlayPolicy::Reject);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    // =========================================================================
    // CLI Override Tests
    // =========================================================================

    #[test]
    fn test_cli_overrides() {
        let mut config = StageConfigFile::default();
        ConfigOverrides::new()
            .with_step_delay_ms(0)
            .with_transient_message_ms(5)
            .with_concurrent_play(ConcurrentPlayPolicy::Ignore)
            .with_swap_scope(SwapScope::Pending)
            .with_random_seed(99)
            .apply(&mut config);

        assert_eq!(config.playback.step_delay, Duration::ZERO);
        assert_eq!(
            config.playback.transient_message_duration,
            Duration::from_millis(5)
        );
        assert_eq!(config.playback.concurrent_play, ConcurrentPlayPolicy::Ignore);
        assert_eq!(config.playback.swap_scope, SwapScope::Pending);
        assert_eq!(config.playback.random_seed, Some(99));
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_empty_overrides_keep_source() {
        let mut config = StageConfigFile::default();
        let overrides = ConfigOverrides::new();
        assert!(overrides.is_empty());
        overrides.apply(&mut config);
        assert_eq!(config.source(), ConfigSource::Default);
    }
}
