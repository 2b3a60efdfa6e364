//! Configuration module for netmark-router
//!
//! This module provides configuration types and loading utilities.
//!
//! # Example
//!
//! ```no_run
//! use netmark_router::config::{load_config, Config};
//!
//! let config = load_config("/etc/netmark-router/config.json").unwrap();
//! println!("Base table index: {}", config.tables.base_index);
//! ```

mod loader;
mod types;

pub use loader::{create_default_config, load_config, load_config_str, load_config_with_env};
pub use types::{Config, LogConfig, TablesConfig, ToolsConfig};
