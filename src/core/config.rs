use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::connection::resolver::{DEFAULT_ADDRESS, DEFAULT_PORT};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub demo: DemoConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Address to connect to at startup; falls back to the persisted one
    pub address: Option<String>,
    #[serde(default = "default_address")]
    pub default_address: String,
    #[serde(default = "default_port")]
    pub default_port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_store_name")]
    pub store_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_enroll_followup_ms")]
    pub enroll_followup_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DemoConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

// Default value functions
fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_request_timeout() -> u64 {
    30
}

fn default_session_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_store_name() -> String {
    "distcapsule_prefs".to_string()
}

fn default_interval_ms() -> u64 {
    10_000
}

fn default_enroll_followup_ms() -> u64 {
    2_500
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: None,
            default_address: default_address(),
            default_port: default_port(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dir: default_session_dir(),
            store_name: default_store_name(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            enroll_followup_ms: default_enroll_followup_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            console: default_console(),
        }
    }
}

impl ConnectionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn enroll_followup(&self) -> Duration {
        Duration::from_millis(self.enroll_followup_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate connection config
        if self.connection.default_address.trim().is_empty() {
            bail!("default_address must not be empty");
        }

        if self.connection.default_port == 0 {
            bail!("default_port must be greater than 0");
        }

        if self.connection.request_timeout == 0 {
            bail!("request_timeout must be greater than 0");
        }

        // Validate session config
        if self.session.store_name.trim().is_empty() {
            bail!("store_name must not be empty");
        }

        if self.session.store_name.contains(['/', '\\']) {
            bail!("store_name '{}' must not contain path separators", self.session.store_name);
        }

        // Validate refresh config
        if self.refresh.interval_ms == 0 {
            bail!("interval_ms must be greater than 0");
        }

        if self.refresh.enroll_followup_ms == 0 {
            bail!("enroll_followup_ms must be greater than 0");
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}
