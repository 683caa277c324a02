//! Configuration management for the EFRIS client.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/efris/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use efris_protocol::{ClientKey, Routing};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Production endpoint of the invoicing service.
pub const DEFAULT_ENDPOINT_URL: &str = "https://efrisws.ura.go.ug/ws/taapp/getInformation";

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("tin must not be empty")]
    MissingTin,

    #[error("device_no must not be empty")]
    MissingDeviceNo,

    #[error("endpoint_url must start with http:// or https://, got {0}")]
    InvalidEndpointUrl(String),

    #[error("request_timeout_secs must be between 1 and 300 seconds, got {0}")]
    InvalidRequestTimeout(u64),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the EFRIS client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Taxpayer and device identity used for routing.
    pub taxpayer: TaxpayerConfig,

    /// Service endpoint settings.
    pub service: ServiceConfig,

    /// Key material locations.
    pub keys: KeysConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Taxpayer and device identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct TaxpayerConfig {
    /// Taxpayer identification number.
    pub tin: String,

    /// Registered EFD/device number.
    pub device_no: String,

    /// Business registration number (optional).
    pub brn: String,

    /// Time zone label sent with each request.
    pub time_zone: Option<String>,
}

/// Service endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// URL that every envelope is POSTed to.
    pub endpoint_url: String,

    /// Timeout for a single HTTP exchange, in seconds.
    pub request_timeout_secs: u64,

    /// Whether endpoint operations encrypt their payloads.
    pub encrypt_by_default: bool,
}

/// Key material locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeysConfig {
    /// PEM file holding the taxpayer's RSA private key.
    pub private_key_path: PathBuf,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            request_timeout_secs: 30,
            encrypt_by_default: true,
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            private_key_path: default_config_dir().join("private_key.pem"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Returns the default configuration directory.
fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("efris")
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - EFRIS_ENDPOINT_URL: Override the service endpoint
    /// - EFRIS_TIN: Override the taxpayer identification number
    /// - EFRIS_DEVICE_NO: Override the device number
    /// - EFRIS_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env("EFRIS_ENDPOINT_URL") {
            tracing::info!("Overriding endpoint_url from environment: {}", url);
            self.service.endpoint_url = url;
        }

        if let Some(tin) = non_empty_env("EFRIS_TIN") {
            tracing::info!("Overriding tin from environment");
            self.taxpayer.tin = tin;
        }

        if let Some(device_no) = non_empty_env("EFRIS_DEVICE_NO") {
            tracing::info!("Overriding device_no from environment");
            self.taxpayer.device_no = device_no;
        }

        if let Some(level) = non_empty_env("EFRIS_LOG_LEVEL") {
            tracing::info!("Overriding log_level from environment: {}", level);
            self.logging.log_level = level;
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.taxpayer.tin.trim().is_empty() {
            return Err(ConfigError::MissingTin);
        }

        if self.taxpayer.device_no.trim().is_empty() {
            return Err(ConfigError::MissingDeviceNo);
        }

        let url = &self.service.endpoint_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::InvalidEndpointUrl(url.clone()));
        }

        let timeout = self.service.request_timeout_secs;
        if !(1..=300).contains(&timeout) {
            return Err(ConfigError::InvalidRequestTimeout(timeout));
        }

        let level = self.logging.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.log_level.clone()));
        }

        Ok(())
    }

    /// Routing parameters for every envelope this client sends.
    pub fn routing(&self) -> Routing {
        Routing {
            tin: self.taxpayer.tin.clone(),
            device_no: self.taxpayer.device_no.clone(),
            brn: self.taxpayer.brn.clone(),
            time_zone: self.taxpayer.time_zone.clone(),
        }
    }

    /// Timeout for one HTTP exchange.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.service.request_timeout_secs)
    }

    /// Loads the taxpayer's private key from `keys.private_key_path`.
    pub fn load_client_key(&self) -> Result<ClientKey> {
        ClientKey::from_pem_file(&self.keys.private_key_path).with_context(|| {
            format!(
                "Failed to load private key: {}",
                self.keys.private_key_path.display()
            )
        })
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
