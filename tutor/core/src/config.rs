//! Client Configuration
//!
//! Loads the client settings from `~/.config/tutor/client.toml`, environment
//! variables and command-line overrides.
//!
//! # Configuration Priority
//!
//! Highest first:
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000"
//! request_timeout_ms = 30000
//!
//! [chat]
//! typing_tick_ms = 500
//! fallback_text = "Sorry, I don't have enough information to answer that question."
//!
//! [dashboard]
//! poll_interval_secs = 30
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Overrides |
//! |---|---|
//! | `TUTOR_API_URL` | `api.base_url` |
//! | `TUTOR_REQUEST_TIMEOUT_MS` | `api.request_timeout_ms` |
//! | `TUTOR_TYPING_TICK_MS` | `chat.typing_tick_ms` |
//! | `TUTOR_POLL_INTERVAL_SECS` | `dashboard.poll_interval_secs` |

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::FALLBACK_ANSWER;

/// Default service location
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Longest accepted typing ticker period
pub const MAX_TYPING_TICK: Duration = Duration::from_secs(10);
/// Longest accepted analytics poll period
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Environment variable for the service base URL
pub const ENV_API_URL: &str = "TUTOR_API_URL";
/// Environment variable for the request timeout
pub const ENV_REQUEST_TIMEOUT_MS: &str = "TUTOR_REQUEST_TIMEOUT_MS";
/// Environment variable for the typing ticker period
pub const ENV_TYPING_TICK_MS: &str = "TUTOR_TYPING_TICK_MS";
/// Environment variable for the analytics poll period
pub const ENV_POLL_INTERVAL_SECS: &str = "TUTOR_POLL_INTERVAL_SECS";

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

/// Tracks where the effective configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Command-line argument
    Cli,
    /// Environment variable
    Env,
    /// TOML configuration file
    File,
    /// Built-in defaults
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
// TOML Structures
// =============================================================================

/// `[api]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiToml {
    /// Service base URL
    pub base_url: Option<String>,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: Option<u64>,
}

/// `[chat]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// Typing ticker period in milliseconds
    pub typing_tick_ms: Option<u64>,
    /// Canned reply text
    pub fallback_text: Option<String>,
}

/// `[dashboard]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardToml {
    /// Analytics poll period in seconds
    pub poll_interval_secs: Option<u64>,
}

/// Top-level TOML file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// Service settings
    pub api: ApiToml,
    /// Chat widget settings
    pub chat: ChatToml,
    /// Dashboard settings
    pub dashboard: DashboardToml,
}

// =============================================================================
// Effective Configuration
// =============================================================================

/// Where and how to reach the service
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Chat widget settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatConfig {
    /// Typing ellipsis period
    pub typing_tick: Duration,
    /// Text of the canned bot reply
    pub fallback_text: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            typing_tick: Duration::from_millis(500),
            fallback_text: FALLBACK_ANSWER.to_string(),
        }
    }
}

/// Dashboard settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Analytics poll period
    pub poll_interval: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
        }
    }
}

/// Complete client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Service settings
    pub api: ApiConfig,
    /// Chat widget settings
    pub chat: ChatConfig,
    /// Dashboard settings
    pub dashboard: DashboardConfig,
    /// Config file that was loaded, if any
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            chat: ChatConfig::default(),
            dashboard: DashboardConfig::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ClientConfig {
    /// Configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest-priority source that contributed a value
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Reject values the controllers cannot work with
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for zero or out-of-range
    /// periods, or a base URL that is not `http://` or `https://`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "api.base_url must start with http:// or https://, got {url:?}"
            )));
        }
        if self.api.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "api.request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.chat.typing_tick.is_zero() || self.chat.typing_tick > MAX_TYPING_TICK {
            return Err(ConfigError::ValidationError(format!(
                "chat.typing_tick_ms must be between 1 and {}",
                MAX_TYPING_TICK.as_millis()
            )));
        }
        if self.dashboard.poll_interval.is_zero() || self.dashboard.poll_interval > MAX_POLL_INTERVAL
        {
            return Err(ConfigError::ValidationError(format!(
                "dashboard.poll_interval_secs must be between 1 and {}",
                MAX_POLL_INTERVAL.as_secs()
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Default configuration file path
///
/// `$XDG_CONFIG_HOME/tutor/client.toml`, usually `~/.config/tutor/client.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tutor").join("client.toml"))
}

/// Load configuration from the default file and the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed,
/// or if the result fails validation. A missing file is not an error.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific file and the environment
///
/// # Errors
///
/// Same as [`load_config`].
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ClientConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration using `lookup` in place of the process environment
///
/// # Errors
///
/// Same as [`load_config`].
pub fn load_config_with_env(
    path: Option<PathBuf>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ClientConfig, ConfigError> {
    let mut config = ClientConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ClientToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(path = %config_path.display(), "Loaded configuration from file");
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, lookup);
    config.validate()?;
    Ok(config)
}

fn apply_toml_config(config: &mut ClientConfig, toml: &ClientToml) {
    if let Some(ref url) = toml.api.base_url {
        config.api.base_url.clone_from(url);
    }
    if let Some(ms) = toml.api.request_timeout_ms {
        config.api.request_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.chat.typing_tick_ms {
        config.chat.typing_tick = Duration::from_millis(ms);
    }
    if let Some(ref text) = toml.chat.fallback_text {
        config.chat.fallback_text.clone_from(text);
    }
    if let Some(secs) = toml.dashboard.poll_interval_secs {
        config.dashboard.poll_interval = Duration::from_secs(secs);
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    let parsed = value.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!(key, value, "Ignoring unparsable environment override");
    }
    parsed
}

fn apply_env_config(config: &mut ClientConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(ENV_API_URL) {
        config.api.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = lookup(ENV_REQUEST_TIMEOUT_MS).and_then(|v| parse_env(ENV_REQUEST_TIMEOUT_MS, &v)) {
        config.api.request_timeout = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = lookup(ENV_TYPING_TICK_MS).and_then(|v| parse_env(ENV_TYPING_TICK_MS, &v)) {
        config.chat.typing_tick = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(secs) =
        lookup(ENV_POLL_INTERVAL_SECS).and_then(|v| parse_env(ENV_POLL_INTERVAL_SECS, &v))
    {
        config.dashboard.poll_interval = Duration::from_secs(secs);
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Command-line overrides, applied after [`load_config`]
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Service base URL override
    pub api_url: Option<String>,
    /// Analytics poll period override (seconds)
    pub poll_interval_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Create an empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL override
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Set the poll period override
    #[must_use]
    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = Some(secs);
        self
    }

    /// Apply the overrides and re-validate
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if an override is invalid.
    pub fn apply(&self, config: &mut ClientConfig) -> Result<(), ConfigError> {
        if let Some(ref url) = self.api_url {
            config.api.base_url.clone_from(url);
            config.source = ConfigSource::Cli;
        }
        if let Some(secs) = self.poll_interval_secs {
            config.dashboard.poll_interval = Duration::from_secs(secs);
            config.source = ConfigSource::Cli;
        }
        config.validate()
    }
}
