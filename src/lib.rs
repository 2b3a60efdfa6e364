//! netmark-router: Per-interface policy routing control plane
//!
//! This crate steers selected traffic through secondary routing tables
//! on Linux, one table per managed interface, using fwmark-based policy
//! rules and iptables mark chains.
//!
//! # Features
//!
//! - **Secondary Tables**: One routing table per interface, derived
//!   from a configurable base index
//! - **Fwmark Steering**: Policy rules match a packet's mark and select
//!   the interface's table
//! - **Destination Marks**: Mangle-chain rules mark traffic by
//!   destination prefix
//! - **Uid Binding**: Uid ranges are bound to a network and their
//!   traffic redirected through its chain
//! - **Host Exemptions**: Single hosts escape marking and stay on the
//!   main table
//!
//! # Architecture
//!
//! ```text
//! Local socket → st_mangle_OUTPUT → st_mangle_<iface>_OUTPUT → mark M
//!                      ↓                                         ↓
//!               st_mangle_EXEMPT                      ip rule fwmark M table M
//!                (protect mark)                                  ↓
//!                                                     secondary table M → iface
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use netmark_router::chain::FwmarkRuleManager;
//! use netmark_router::config::load_config;
//! use netmark_router::exec::{CommandSequencer, SystemExecutor};
//! use netmark_router::registry::StaticRegistry;
//! use netmark_router::rules::{RuleRefCounter, TableMap};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration
//! let config = load_config("/etc/netmark-router/config.json")?;
//!
//! // Shared control-plane state
//! let sequencer = Arc::new(CommandSequencer::new(
//!     Arc::new(SystemExecutor::new()),
//!     config.tools.clone(),
//! ));
//! let registry = Arc::new(StaticRegistry::new());
//! registry.insert_network("tun0", 5);
//! let counter = Arc::new(RuleRefCounter::new());
//! let tables = TableMap::new(config.tables.base_index);
//!
//! // Install the base chains and steer tun0's traffic
//! let manager = FwmarkRuleManager::new(sequencer, registry, counter, tables);
//! manager.setup_hooks()?;
//! manager.add_fwmark_rule("tun0")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`chain`]: Chain names and per-interface fwmark rule lifecycle
//! - [`config`]: Configuration types and loading
//! - [`error`]: Error types
//! - [`exec`]: External tool execution and command sequencing
//! - [`marks`]: Destination marks, uid rules, exemptions, mark queries
//! - [`registry`]: Network registry seam
//! - [`response`]: Operation result reporting
//! - [`routes`]: Secondary-table route editing
//! - [`rules`]: Table index mapping and rule reference counting

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod chain;
pub mod config;
pub mod error;
pub mod exec;
pub mod marks;
pub mod registry;
pub mod response;
pub mod routes;
pub mod rules;

// Re-export commonly used types at the crate root
pub use chain::FwmarkRuleManager;
pub use config::{Config, LogConfig, TablesConfig, ToolsConfig};
pub use error::{CommandError, ConfigError, NetmarkError, RouteError, RuleError};
pub use exec::{
    CommandExecutor, CommandSequencer, Family, RecordingExecutor, SequenceOutcome, SystemExecutor,
    Target,
};
pub use marks::{DestinationMarkManager, HostExemptionManager, MarkQueryService, UidRuleManager};
pub use registry::{NetworkRegistry, StaticRegistry};
pub use response::{BufferedResponseSink, NoOpResponseSink, ResponseCode, ResponseSink};
pub use routes::RouteEditor;
pub use rules::{RuleRefCounter, TableMap};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
