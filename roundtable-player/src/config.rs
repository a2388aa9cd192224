//! Runtime configuration for roundtable-player
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (`--bind`, `--log-level`)
//! 2. TOML bootstrap file (see `roundtable_common::config`)
//! 3. Built-in defaults
//!
//! `RUST_LOG`, when set, replaces the computed log filter entirely.

use crate::error::{Error, Result};
use roundtable_common::config::{GatewayConfig, NodeConfig, TomlConfig};
use std::net::SocketAddr;
use std::path::Path;

/// Overrides collected from the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind_addr: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub event_capacity: usize,
    pub node: NodeConfig,
    pub gateway: GatewayConfig,
    pub log_level: String,
}

impl Config {
    /// Locate and load the TOML file, then apply CLI overrides
    pub fn load(config_path: Option<&Path>, overrides: CliOverrides) -> Result<Self> {
        let toml_config = TomlConfig::load_or_default(config_path)?;
        Self::from_parts(toml_config, overrides)
    }

    pub fn from_parts(toml_config: TomlConfig, overrides: CliOverrides) -> Result<Self> {
        let bind = overrides.bind_addr.unwrap_or(toml_config.bind_addr);
        let bind_addr = bind
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("invalid bind address '{}': {}", bind, e)))?;

        let log_level = overrides
            .log_level
            .unwrap_or(toml_config.logging.level)
            .to_lowercase();
        if !matches!(
            log_level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(Error::Config(format!("unknown log level '{}'", log_level)));
        }

        Ok(Self {
            bind_addr,
            event_capacity: toml_config.event_capacity,
            node: toml_config.node,
            gateway: toml_config.gateway,
            log_level,
        })
    }

    /// Default tracing filter when `RUST_LOG` is not set
    pub fn log_filter(&self) -> String {
        format!(
            "roundtable_player={level},tower_http={level}",
            level = self.log_level
        )
    }
}
