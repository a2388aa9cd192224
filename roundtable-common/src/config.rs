//! Bootstrap configuration loading
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. `ROUNDTABLE_CONFIG` environment variable
//! 3. User config directory (`~/.config/roundtable/config.toml` on Linux)
//! 4. System-wide `/etc/roundtable/config.toml`
//!
//! A missing file is not an error: a warning is logged and built-in defaults
//! are used. A file that exists but does not parse is an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ROUNDTABLE_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Address the HTTP control surface binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Event bus buffer size
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Audio node connection
    #[serde(default)]
    pub node: NodeConfig,

    /// Chat gateway bridge (voice join/leave)
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Audio node connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_node_url")]
    pub base_url: String,

    #[serde(default = "default_node_password")]
    pub password: String,

    /// Session id the node assigned to this client
    #[serde(default)]
    pub session_id: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Gateway bridge settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:5790".to_string()
}

fn default_event_capacity() -> usize {
    100
}

fn default_node_url() -> String {
    "http://127.0.0.1:2333".to_string()
}

fn default_node_password() -> String {
    "youshallnotpass".to_string()
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:5791".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            event_capacity: default_event_capacity(),
            node: NodeConfig::default(),
            gateway: GatewayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            base_url: default_node_url(),
            password: default_node_password(),
            session_id: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config file and load it, falling back to defaults
    ///
    /// Only a missing file degrades to defaults; unreadable or malformed
    /// files are reported.
    pub fn load_or_default(cli_arg: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_arg) {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be greater than 0".to_string()));
        }
        if self.bind_addr.trim().is_empty() {
            return Err(Error::Config("bind_addr must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Find the config file to use
///
/// Explicit paths (CLI, environment) are returned even if they do not exist so
/// the caller can report them. Default locations are only returned when present.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_paths().into_iter().find(|p| p.exists())
}

/// Platform default config file locations, most specific first
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("roundtable").join("config.toml"));
    }
    if cfg!(unix) {
        paths.push(PathBuf::from("/etc/roundtable/config.toml"));
    }
    paths
}
