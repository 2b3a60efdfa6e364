//! Configuration types for netmark-router
//!
//! This module defines all configuration structures used by the control
//! plane. Configuration is loaded from JSON files and can be validated
//! at startup.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rules::table::{DEFAULT_BASE_TABLE_INDEX, MAX_TABLE_INDEX};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Table index derivation
    #[serde(default)]
    pub tables: TablesConfig,

    /// External tool paths
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tables.validate()?;
        self.tools.validate()?;
        self.log.validate()?;
        Ok(())
    }

    /// Create a minimal default configuration
    #[must_use]
    pub fn default_config() -> Self {
        Self {
            tables: TablesConfig::default(),
            tools: ToolsConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

/// Routing table index configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TablesConfig {
    /// Offset added to a network id to form its table index
    #[serde(default = "default_base_index")]
    pub base_index: u32,
}

impl TablesConfig {
    /// Validate table configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for bases that collide
    /// with the reserved kernel tables.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_index == 0 {
            return Err(ConfigError::ValidationError(
                "tables.base_index must be at least 1".into(),
            ));
        }
        if self.base_index > MAX_TABLE_INDEX {
            return Err(ConfigError::ValidationError(format!(
                "tables.base_index {} exceeds the last usable table {}",
                self.base_index, MAX_TABLE_INDEX
            )));
        }
        Ok(())
    }
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            base_index: default_base_index(),
        }
    }
}

/// Paths of the external configuration tools
///
/// Bare names resolve through `PATH`; deployments with fixed layouts
/// can pin absolute paths.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Route and rule tool
    #[serde(default = "default_ip_path")]
    pub ip_path: String,

    /// IPv4 firewall tool
    #[serde(default = "default_iptables_path")]
    pub iptables_path: String,

    /// IPv6 firewall tool
    #[serde(default = "default_ip6tables_path")]
    pub ip6tables_path: String,
}

impl ToolsConfig {
    /// Validate tool paths
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if a path is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, path) in [
            ("tools.ip_path", &self.ip_path),
            ("tools.iptables_path", &self.iptables_path),
            ("tools.ip6tables_path", &self.ip6tables_path),
        ] {
            if path.is_empty() {
                return Err(ConfigError::ValidationError(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ip_path: default_ip_path(),
            iptables_path: default_iptables_path(),
            ip6tables_path: default_ip6tables_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable ANSI colors in log output
    #[serde(default = "default_true")]
    pub ansi: bool,
}

impl LogConfig {
    /// Validate log configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for unknown levels.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(ConfigError::ValidationError(format!(
                "Unknown log level: {other}"
            ))),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            ansi: true,
        }
    }
}

fn default_base_index() -> u32 {
    DEFAULT_BASE_TABLE_INDEX
}

fn default_ip_path() -> String {
    "ip".into()
}

fn default_iptables_path() -> String {
    "iptables".into()
}

fn default_ip6tables_path() -> String {
    "ip6tables".into()
}

fn default_log_level() -> String {
    "info".into()
}

fn default_true() -> bool {
    true
}
