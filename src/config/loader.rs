//! Configuration loading and management
//!
//! This module handles loading configuration from files and environment variables.

use std::path::Path;

use tracing::{debug, info};

use super::types::Config;
use crate::error::ConfigError;

/// Load configuration from a JSON file
///
/// # Arguments
///
/// * `path` - Path to the configuration file
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    debug!("Loading configuration from {:?}", path);

    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path)?;

    let config: Config = serde_json::from_str(&contents)
        .map_err(|e| ConfigError::ParseError(format!("Failed to parse JSON: {e} at {path:?}")))?;

    config.validate()?;

    info!(
        "Configuration loaded: base table index {}, tools {}/{}",
        config.tables.base_index, config.tools.iptables_path, config.tools.ip6tables_path
    );

    Ok(config)
}

/// Load configuration from a JSON string
///
/// # Errors
///
/// Returns `ConfigError` if parsing or validation fails.
pub fn load_config_str(json: &str) -> Result<Config, ConfigError> {
    let config: Config =
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.validate()?;

    Ok(config)
}

/// Load configuration with environment variable overrides
///
/// Environment variables:
/// - `NETMARK_ROUTER_BASE_TABLE`: Override the base table index
/// - `NETMARK_ROUTER_LOG_LEVEL`: Override log level
/// - `NETMARK_ROUTER_IP_PATH`: Override the route tool path
/// - `NETMARK_ROUTER_IPTABLES_PATH`: Override the IPv4 firewall tool path
///
/// # Errors
///
/// Returns `ConfigError` if loading or parsing fails.
pub fn load_config_with_env(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let mut config = load_config(path)?;

    if let Ok(base) = std::env::var("NETMARK_ROUTER_BASE_TABLE") {
        config.tables.base_index = base.parse().map_err(|_| ConfigError::EnvError {
            name: "NETMARK_ROUTER_BASE_TABLE".into(),
            reason: format!("Invalid number: {base}"),
        })?;
        debug!("Base table index overridden to {}", config.tables.base_index);
    }

    if let Ok(level) = std::env::var("NETMARK_ROUTER_LOG_LEVEL") {
        config.log.level = level;
        debug!("Log level overridden to {}", config.log.level);
    }

    if let Ok(path) = std::env::var("NETMARK_ROUTER_IP_PATH") {
        config.tools.ip_path = path;
        debug!("Route tool overridden to {}", config.tools.ip_path);
    }

    if let Ok(path) = std::env::var("NETMARK_ROUTER_IPTABLES_PATH") {
        config.tools.iptables_path = path;
        debug!("IPv4 firewall tool overridden to {}", config.tools.iptables_path);
    }

    // Re-validate after overrides
    config.validate()?;

    Ok(config)
}

/// Create a default configuration file at the given path
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be written.
pub fn create_default_config(path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let config = Config::default_config();
    let json = serde_json::to_string_pretty(&config)
        .map_err(|e| ConfigError::ParseError(format!("Failed to serialize config: {e}")))?;

    std::fs::write(path, json)?;
    Ok(())
}
