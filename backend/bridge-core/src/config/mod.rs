//! Bridge settings: timeouts, listener limits and channel addressing.
//!
//! Settings come from `<config_dir>/bridge.toml` (all keys optional), then
//! environment overrides, then validation. Durations are written the
//! humantime way (`"2s"`, `"100ms"`).

mod duration_str;

use crate::error::config::ConfigError;
use crate::{COMM_TARGET_NAME, LISTENER_HOSTNAME};

use common::ErrorLocation;

use std::env;
use std::net::IpAddr;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "bridge.toml";
const CONFIG_DIR_NAME: &str = "kernel-bridge";

pub const ENV_MODE: &str = "KERNEL_BRIDGE_MODE";
pub const ENV_TIMEOUT: &str = "KERNEL_BRIDGE_TIMEOUT";
pub const ENV_MAX_CONTENT_LENGTH: &str = "KERNEL_BRIDGE_MAX_CONTENT_LENGTH";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 512;

// ============================================
// ENUMS WITH DEFAULTS
// ============================================

/// Which reply path `negotiate` uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationMode {
    /// Frontend answers over the channel.
    Channel,
    /// Frontend POSTs its answer to a one-shot loopback listener.
    #[default]
    Listener,
}

impl NegotiationMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "channel" => Some(NegotiationMode::Channel),
            "listener" => Some(NegotiationMode::Listener),
            _ => None,
        }
    }
}

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NegotiationSettings {
    #[serde(default)]
    pub mode: NegotiationMode,
    #[serde(default = "default_request_timeout", with = "duration_str")]
    pub request_timeout: Duration,
}

impl Default for NegotiationSettings {
    fn default() -> Self {
        Self {
            mode: NegotiationMode::default(),
            request_timeout: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListenerSettings {
    /// Upper bound on each accept wait so the deadline is noticed promptly.
    #[serde(default = "default_poll_interval", with = "duration_str")]
    pub poll_interval: Duration,
    /// Upper bound on serving a single accepted connection.
    #[serde(default = "default_connection_timeout", with = "duration_str")]
    pub connection_timeout: Duration,
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            connection_timeout: default_connection_timeout(),
            max_content_length: default_max_content_length(),
            bind_host: default_bind_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelSettings {
    #[serde(default = "default_target_name")]
    pub target_name: String,
    #[serde(default = "default_connect_timeout", with = "duration_str")]
    pub connect_timeout: Duration,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            target_name: default_target_name(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeConfig {
    #[serde(default)]
    pub negotiation: NegotiationSettings,

    #[serde(default)]
    pub listener: ListenerSettings,

    #[serde(default)]
    pub channel: ChannelSettings,
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}
fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}
fn default_connection_timeout() -> Duration {
    DEFAULT_CONNECTION_TIMEOUT
}
fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}
fn default_max_content_length() -> usize {
    DEFAULT_MAX_CONTENT_LENGTH
}
fn default_bind_host() -> String {
    LISTENER_HOSTNAME.to_string()
}
fn default_target_name() -> String {
    COMM_TARGET_NAME.to_string()
}

// ============================================
// IMPLEMENTATION
// ============================================

impl BridgeConfig {
    /// Platform config directory for the bridge (`<config_dir>/kernel-bridge`).
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME))
            .ok_or_else(|| ConfigError::DirectoryNotFound {
                location: ErrorLocation::from(Location::caller()),
                reason: "platform has no config directory".to_string(),
            })
    }

    /// Load config from {config_dir}/bridge.toml.
    ///
    /// A missing file yields defaults. A present but unreadable or invalid
    /// file is an error.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            })?;

        let config: BridgeConfig = toml::from_str(&contents).map_err(|e| {
            warn!("Failed to parse {}: {}", config_path.display(), e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Load from `config_dir`, then apply `.env` and process environment overrides.
    pub fn from_environment(config_dir: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(config_dir)?;

        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded .env from: {:?}", path),
            Err(e) if e.not_found() => debug!("No .env file found"),
            Err(e) => warn!("Failed to parse .env: {}", e),
        }

        config.apply_overrides(|name| env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MODE) {
            self.negotiation.mode =
                NegotiationMode::parse(&value).ok_or_else(|| ConfigError::OverrideError {
                    location: ErrorLocation::from(Location::caller()),
                    variable: ENV_MODE.to_string(),
                    reason: format!("unknown mode '{value}' (expected channel or listener)"),
                })?;
            debug!("{ENV_MODE} override: {:?}", self.negotiation.mode);
        }

        if let Some(value) = lookup(ENV_TIMEOUT) {
            self.negotiation.request_timeout =
                humantime::parse_duration(value.trim()).map_err(|e| {
                    ConfigError::OverrideError {
                        location: ErrorLocation::from(Location::caller()),
                        variable: ENV_TIMEOUT.to_string(),
                        reason: e.to_string(),
                    }
                })?;
            debug!(
                "{ENV_TIMEOUT} override: {:?}",
                self.negotiation.request_timeout
            );
        }

        if let Some(value) = lookup(ENV_MAX_CONTENT_LENGTH) {
            self.listener.max_content_length =
                value
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::OverrideError {
                        location: ErrorLocation::from(Location::caller()),
                        variable: ENV_MAX_CONTENT_LENGTH.to_string(),
                        reason: e.to_string(),
                    })?;
            debug!(
                "{ENV_MAX_CONTENT_LENGTH} override: {}",
                self.listener.max_content_length
            );
        }

        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero_durations = [
            ("negotiation.request_timeout", self.negotiation.request_timeout),
            ("listener.poll_interval", self.listener.poll_interval),
            ("listener.connection_timeout", self.listener.connection_timeout),
            ("channel.connect_timeout", self.channel.connect_timeout),
        ];
        for (name, value) in zero_durations {
            if value.is_zero() {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("{name} must be greater than zero"),
                });
            }
        }

        if self.listener.max_content_length == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "listener.max_content_length must be greater than zero".to_string(),
            });
        }

        match self.listener.bind_host.parse::<IpAddr>() {
            Ok(ip) if ip.is_loopback() => {}
            Ok(ip) => {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("listener.bind_host must be a loopback address, got {ip}"),
                });
            }
            Err(e) => {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!(
                        "listener.bind_host '{}' is not an IP address: {e}",
                        self.listener.bind_host
                    ),
                });
            }
        }

        if self.channel.target_name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "channel.target_name must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
