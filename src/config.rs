//! # Configuration Management
//!
//! Centralized configuration for the login-server link.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()` / `from_toml()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()` (`LOGIN_LINK_*`)
//!
//! Durations are written as milliseconds.

use crate::core::packet::NAME_LENGTH;
use crate::error::{LinkError, Result};
use crate::protocol::liveness::DEFAULT_STALL_TIME;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Default login server port
pub const DEFAULT_LOGIN_PORT: u16 = 6900;

/// Default bound on a single connection attempt
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LinkConfig {
    /// Login server address and credentials
    #[serde(default)]
    pub login: LoginServerConfig,

    /// Ping/pong stall detection
    #[serde(default)]
    pub liveness: LivenessConfig,

    /// Reconnect scheduling
    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LinkConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| LinkError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| LinkError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| LinkError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("LOGIN_LINK_ADDRESS") {
            config.login.address = addr;
        }

        if let Ok(port) = std::env::var("LOGIN_LINK_PORT") {
            config.login.port = port
                .parse::<u16>()
                .map_err(|e| LinkError::ConfigError(format!("Invalid LOGIN_LINK_PORT: {e}")))?;
        }

        if let Ok(userid) = std::env::var("LOGIN_LINK_USERID") {
            config.login.userid = userid;
        }

        if let Ok(passwd) = std::env::var("LOGIN_LINK_PASSWD") {
            config.login.passwd = passwd;
        }

        if let Ok(stall) = std::env::var("LOGIN_LINK_STALL_TIME_MS") {
            config.liveness.stall_time = env_millis("LOGIN_LINK_STALL_TIME_MS", &stall)?;
        }

        if let Ok(interval) = std::env::var("LOGIN_LINK_CHECK_INTERVAL_MS") {
            config.supervisor.check_interval =
                env_millis("LOGIN_LINK_CHECK_INTERVAL_MS", &interval)?;
        }

        if let Ok(timeout) = std::env::var("LOGIN_LINK_CONNECT_TIMEOUT_MS") {
            config.supervisor.connect_timeout =
                env_millis("LOGIN_LINK_CONNECT_TIMEOUT_MS", &timeout)?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.login.validate());
        errors.extend(self.liveness.validate());
        errors.extend(self.supervisor.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(LinkError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

fn env_millis(name: &str, value: &str) -> Result<Duration> {
    value
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| LinkError::ConfigError(format!("Invalid {name}: {e}")))
}

/// Login server connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginServerConfig {
    /// Host name or IP address of the login server
    pub address: String,

    /// Login server port
    pub port: u16,

    /// Inter-server user id (at most 24 bytes)
    pub userid: String,

    /// Inter-server password (at most 24 bytes)
    pub passwd: String,
}

impl Default for LoginServerConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1"),
            port: DEFAULT_LOGIN_PORT,
            userid: String::from("s1"),
            passwd: String::from("p1"),
        }
    }
}

impl LoginServerConfig {
    /// Validate login server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Login server address cannot be empty".to_string());
        }

        if self.port == 0 {
            errors.push("Login server port cannot be 0".to_string());
        }

        for (name, value) in [("userid", &self.userid), ("passwd", &self.passwd)] {
            if value.is_empty() {
                errors.push(format!("Login server {name} cannot be empty"));
            } else if value.len() > NAME_LENGTH {
                errors.push(format!(
                    "Login server {name} too long: {} bytes (maximum: {NAME_LENGTH})",
                    value.len()
                ));
            }
        }

        errors
    }
}

/// Stall detection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LivenessConfig {
    /// Idle time before a ping is sent; twice this closes the connection
    #[serde(with = "duration_serde")]
    pub stall_time: Duration,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            stall_time: DEFAULT_STALL_TIME,
        }
    }
}

impl LivenessConfig {
    /// Validate liveness configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.stall_time.as_millis() < 100 {
            errors.push("Stall time too short (minimum: 100ms)".to_string());
        } else if self.stall_time.as_secs() > 3600 {
            errors.push("Stall time too long (maximum: 1 hour)".to_string());
        }

        errors
    }
}

/// Reconnect scheduling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SupervisorConfig {
    /// Delay before the first connection check
    #[serde(with = "duration_serde")]
    pub initial_delay: Duration,

    /// Interval between connection checks
    #[serde(with = "duration_serde")]
    pub check_interval: Duration,

    /// Interval between read cycles
    #[serde(with = "duration_serde")]
    pub poll_interval: Duration,

    /// Longest a single connection attempt may take
    #[serde(with = "duration_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            check_interval: Duration::from_secs(10),
            poll_interval: Duration::from_millis(50),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl SupervisorConfig {
    /// Validate supervisor configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.initial_delay.as_secs() > 60 {
            errors.push("Initial delay too long (maximum: 60s)".to_string());
        }

        if self.check_interval.as_millis() < 10 {
            errors.push("Check interval too short (minimum: 10ms)".to_string());
        } else if self.check_interval.as_secs() > 3600 {
            errors.push("Check interval too long (maximum: 1 hour)".to_string());
        }

        if self.poll_interval.is_zero() {
            errors.push("Poll interval must be greater than 0".to_string());
        } else if self.poll_interval > self.check_interval {
            errors.push("Poll interval cannot be longer than the check interval".to_string());
        }

        if self.connect_timeout.as_millis() < 10 {
            errors.push("Connect timeout too short (minimum: 10ms)".to_string());
        } else if self.connect_timeout.as_secs() > 60 {
            errors.push("Connect timeout too long (maximum: 60s)".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("login-link"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
