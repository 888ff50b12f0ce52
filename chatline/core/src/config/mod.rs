//! TOML Configuration File Support
//!
//! Configuration for the chat client, read from
//! `$XDG_CONFIG_HOME/chatline/chatline.toml`.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [transport]
//! endpoint = "http://www.jpgcp.cloud/chat-api-svc/api/v1/chat"
//! connect_timeout_ms = 5000
//! request_timeout_secs = 300
//!
//! [client]
//! seed_conversations = true
//! max_message_length = 32768
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `CHATLINE_ENDPOINT` | `transport.endpoint` |
//! | `CHATLINE_CONNECT_TIMEOUT` | `transport.connect_timeout_ms` |
//! | `CHATLINE_REQUEST_TIMEOUT` | `transport.request_timeout_secs` |
//! | `CHATLINE_MAX_MESSAGE_LENGTH` | `client.max_message_length` |

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chat service endpoint used when nothing else is configured
pub const DEFAULT_ENDPOINT: &str = "http://www.jpgcp.cloud/chat-api-svc/api/v1/chat";

/// Environment variable names
pub mod env {
    /// Chat service endpoint URL
    pub const ENDPOINT: &str = "CHATLINE_ENDPOINT";
    /// Connect timeout in milliseconds
    pub const CONNECT_TIMEOUT: &str = "CHATLINE_CONNECT_TIMEOUT";
    /// Whole-request timeout in seconds (0 disables)
    pub const REQUEST_TIMEOUT: &str = "CHATLINE_REQUEST_TIMEOUT";
    /// Maximum accepted message length in characters
    pub const MAX_MESSAGE_LENGTH: &str = "CHATLINE_MAX_MESSAGE_LENGTH";
}

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

/// Tracks where the configuration came from
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

/// Transport section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportToml {
    /// Chat service endpoint URL
    pub endpoint: Option<String>,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// Whole-request timeout in seconds (0 = no timeout)
    pub request_timeout_secs: Option<u64>,
}

/// Client section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// Start with the demo conversations
    pub seed_conversations: Option<bool>,

    /// Maximum message length in characters
    pub max_message_length: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatlineToml {
    /// Transport configuration section
    pub transport: TransportToml,

    /// Client configuration section
    pub client: ClientToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// HTTP transport settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportConfig {
    /// Chat service endpoint URL
    pub endpoint: String,
    /// Time allowed to establish the connection
    pub connect_timeout: Duration,
    /// Time allowed for the whole exchange (`None` = unbounded)
    pub request_timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: Duration::from_millis(5000),
            request_timeout: Some(Duration::from_secs(300)),
        }
    }
}

/// Client behavior settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Start with the demo conversations
    pub seed_conversations: bool,
    /// Maximum message length in characters
    pub max_message_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            seed_conversations: true,
            max_message_length: 32768,
        }
    }
}

/// Centralized configuration for the chat client
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct ChatlineConfig {
    /// Transport configuration
    pub transport: TransportConfig,

    /// Client configuration
    pub client: ClientConfig,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Highest-priority source that contributed a value
    source: ConfigSource,
}

impl Default for ChatlineConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            client: ClientConfig::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ChatlineConfig {
    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check values that cannot be expressed in the types
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the endpoint is not an
    /// http(s) URL or the message length limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.transport.endpoint).map_err(|e| {
            ConfigError::ValidationError(format!(
                "endpoint {:?} is not a valid URL: {e}",
                self.transport.endpoint
            ))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "endpoint scheme must be http or https, got {:?}",
                url.scheme()
            )));
        }

        if self.client.max_message_length == 0 {
            return Err(ConfigError::ValidationError(
                "max_message_length must be greater than zero".to_string(),
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
/// Returns `$XDG_CONFIG_HOME/chatline/chatline.toml` or
/// `~/.config/chatline/chatline.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("chatline").join("chatline.toml"))
}

/// Load configuration from the default path and the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if the
/// resulting configuration is invalid. A missing config file is not an error.
pub fn load_config() -> Result<ChatlineConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed, or
/// if the resulting configuration is invalid.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ChatlineConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration, reading environment variables through `lookup`
fn load_config_with_env<F>(path: Option<PathBuf>, lookup: F) -> Result<ChatlineConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ChatlineConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ChatlineToml = toml::from_str(&toml_content)?;
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

    apply_env_config(&mut config, lookup);
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ChatlineConfig, toml: &ChatlineToml) {
    if let Some(ref endpoint) = toml.transport.endpoint {
        config.transport.endpoint = endpoint.clone();
    }
    if let Some(timeout) = toml.transport.connect_timeout_ms {
        config.transport.connect_timeout = Duration::from_millis(timeout);
    }
    if let Some(timeout) = toml.transport.request_timeout_secs {
        config.transport.request_timeout = request_timeout(timeout);
    }

    if let Some(seed) = toml.client.seed_conversations {
        config.client.seed_conversations = seed;
    }
    if let Some(length) = toml.client.max_message_length {
        config.client.max_message_length = length;
    }
}

/// Apply environment variable overrides to the config
///
/// Unparseable numeric values are ignored with a warning.
fn apply_env_config<F>(config: &mut ChatlineConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(endpoint) = lookup(env::ENDPOINT) {
        config.transport.endpoint = endpoint;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = parse_env::<u64>(&lookup, env::CONNECT_TIMEOUT) {
        config.transport.connect_timeout = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(secs) = parse_env::<u64>(&lookup, env::REQUEST_TIMEOUT) {
        config.transport.request_timeout = request_timeout(secs);
        config.source = ConfigSource::Env;
    }
    if let Some(length) = parse_env::<usize>(&lookup, env::MAX_MESSAGE_LENGTH) {
        config.client.max_message_length = length;
        config.source = ConfigSource::Env;
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var = key, value = %raw, "Ignoring unparseable environment variable");
            None
        }
    }
}

/// Zero disables the whole-request timeout
fn request_timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides,
/// then call [`ChatlineConfig::validate`] again.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Endpoint override
    pub endpoint: Option<String>,

    /// Connect timeout override (milliseconds)
    pub connect_timeout_ms: Option<u64>,

    /// Request timeout override (seconds, 0 disables)
    pub request_timeout_secs: Option<u64>,

    /// Seed conversations override
    pub seed_conversations: Option<bool>,

    /// Max message length override
    pub max_message_length: Option<usize>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set endpoint override
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Set connect timeout override
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = Some(ms);
        self
    }

    /// Set request timeout override
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    /// Set seed conversations override
    #[must_use]
    pub fn with_seed_conversations(mut self, seed: bool) -> Self {
        self.seed_conversations = Some(seed);
        self
    }

    /// Set max message length override
    #[must_use]
    pub fn with_max_message_length(mut self, length: usize) -> Self {
        self.max_message_length = Some(length);
        self
    }

    /// Whether any override is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoint.is_none()
            && self.connect_timeout_ms.is_none()
            && self.request_timeout_secs.is_none()
            && self.seed_conversations.is_none()
            && self.max_message_length.is_none()
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut ChatlineConfig) {
        if !self.is_empty() {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref endpoint) = self.endpoint {
            config.transport.endpoint = endpoint.clone();
        }
        if let Some(ms) = self.connect_timeout_ms {
            config.transport.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = self.request_timeout_secs {
            config.transport.request_timeout = request_timeout(secs);
        }
        if let Some(seed) = self.seed_conversations {
            config.client.seed_conversations = seed;
        }
        if let Some(length) = self.max_message_length {
            config.client.max_message_length = length;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
