//! Error types for netmark-router
//!
//! This module defines the error hierarchy for the routing control plane.
//! All errors are categorized by subsystem and include recovery hints.

use std::io;

use thiserror::Error;

/// Top-level error type for netmark-router
#[derive(Debug, Error)]
pub enum NetmarkError {
    /// Configuration errors (file parsing, validation)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// External tool spawn errors
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Rule setup/teardown errors
    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    /// Route table editing errors
    #[error("Route error: {0}")]
    Route(#[from] RouteError),

    /// I/O errors not covered by other categories
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl NetmarkError {
    /// Check if this error is recoverable (can retry operation)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Command(e) => e.is_recoverable(),
            Self::Rule(e) => e.is_recoverable(),
            Self::Route(e) => e.is_recoverable(),
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
            ),
        }
    }
}

/// Convenience alias for results with [`NetmarkError`]
pub type Result<T> = std::result::Result<T, NetmarkError>;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found or inaccessible
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Validation error (invalid values, missing required fields)
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// Environment variable error
    #[error("Environment variable error: {name}: {reason}")]
    EnvError { name: String, reason: String },

    /// I/O error while reading config
    #[error("I/O error reading configuration: {0}")]
    IoError(#[from] io::Error),
}

impl ConfigError {
    /// Config errors are not recoverable without user intervention
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        false
    }
}

/// Errors from spawning the external configuration tools
///
/// A tool that runs and exits non-zero is not an error at this layer;
/// the exit status is returned as a value so callers can apply their
/// own fatality rules per step.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The tool could not be spawned at all
    #[error("Failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },

    /// The tool was killed by a signal before exiting
    #[error("{program} was terminated by a signal")]
    Signaled { program: String },
}

impl CommandError {
    /// Check if this error is recoverable
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Spawn { .. } => false,
            Self::Signaled { .. } => true,
        }
    }

    /// Create a spawn error
    pub fn spawn(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Spawn {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Create a signal-termination error
    pub fn signaled(program: impl Into<String>) -> Self {
        Self::Signaled {
            program: program.into(),
        }
    }
}

/// Errors from fwmark, uid, and exemption rule management
#[derive(Debug, Error)]
pub enum RuleError {
    /// Rules already active for this network (re-initialization refused)
    #[error("Network {net_id} already has active rules")]
    Busy { net_id: u32 },

    /// The network registry refused the uid range binding
    #[error("Registry rejected uid range {uid_start}-{uid_end}")]
    UidBinding { uid_start: i32, uid_end: i32 },

    /// An external configuration call exited non-zero
    #[error("Rule configuration command failed with status {status}")]
    CommandFailed { status: i32 },

    /// Destination address or prefix length does not parse
    #[error("Invalid destination {addr}/{prefix}")]
    InvalidDestination { addr: String, prefix: u8 },

    /// Net id maps past the last usable table into the reserved region
    #[error("Network {net_id} maps outside the usable table range")]
    TableOutOfRange { net_id: u32 },
}

impl RuleError {
    /// Check if this error is recoverable
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Busy { .. } => true,
            Self::UidBinding { .. } => false,
            Self::CommandFailed { .. } => true,
            Self::InvalidDestination { .. } | Self::TableOutOfRange { .. } => false,
        }
    }

    /// Create a busy error
    #[must_use]
    pub const fn busy(net_id: u32) -> Self {
        Self::Busy { net_id }
    }

    /// Create a uid binding error
    #[must_use]
    pub const fn uid_binding(uid_start: i32, uid_end: i32) -> Self {
        Self::UidBinding { uid_start, uid_end }
    }

    /// Create a command failure error
    #[must_use]
    pub const fn command_failed(status: i32) -> Self {
        Self::CommandFailed { status }
    }

    /// Create an invalid destination error
    pub fn invalid_destination(addr: impl Into<String>, prefix: u8) -> Self {
        Self::InvalidDestination {
            addr: addr.into(),
            prefix,
        }
    }

    /// Create a table range error
    #[must_use]
    pub const fn table_out_of_range(net_id: u32) -> Self {
        Self::TableOutOfRange { net_id }
    }
}

/// Errors from route table editing
#[derive(Debug, Error)]
pub enum RouteError {
    /// The route tool exited non-zero
    #[error("ip route modification failed with status {status}")]
    CommandFailed { status: i32 },

    /// Destination address or prefix length does not parse
    #[error("Invalid destination {addr}/{prefix}")]
    InvalidDestination { addr: String, prefix: u8 },

    /// Net id maps past the last usable table into the reserved region
    #[error("Network {net_id} maps outside the usable table range")]
    TableOutOfRange { net_id: u32 },
}

impl RouteError {
    /// Check if this error is recoverable
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::CommandFailed { .. } => true,
            Self::InvalidDestination { .. } | Self::TableOutOfRange { .. } => false,
        }
    }

    /// Create a command failure error
    #[must_use]
    pub const fn command_failed(status: i32) -> Self {
        Self::CommandFailed { status }
    }

    /// Create an invalid destination error
    pub fn invalid_destination(addr: impl Into<String>, prefix: u8) -> Self {
        Self::InvalidDestination {
            addr: addr.into(),
            prefix,
        }
    }

    /// Create a table range error
    #[must_use]
    pub const fn table_out_of_range(net_id: u32) -> Self {
        Self::TableOutOfRange { net_id }
    }
}
