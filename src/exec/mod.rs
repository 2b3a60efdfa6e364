//! External tool execution
//!
//! All kernel configuration happens by spawning the system `ip` and
//! `iptables`/`ip6tables` tools and waiting for them to exit. The
//! [`CommandExecutor`] trait is the seam between rule logic and process
//! spawning: production code uses [`SystemExecutor`], tests use
//! [`RecordingExecutor`] to capture argument vectors and script
//! failures without touching the host.

use std::process::Command;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::CommandError;

pub mod sequencer;

pub use sequencer::{CommandSequencer, Family, SequenceOutcome, Target};

/// Spawns one external configuration tool and waits for completion
///
/// Implementations must not retry and must not impose timeouts; a hung
/// tool blocks the caller, matching the synchronous execution contract.
pub trait CommandExecutor: Send + Sync {
    /// Run `program` with `args` to completion and return its exit status.
    ///
    /// A non-zero exit is a normal return value, not an error; only a
    /// failure to spawn or a signal death is an [`CommandError`].
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Spawn`] if the process cannot be started
    /// and [`CommandError::Signaled`] if it dies without an exit code.
    fn execute(&self, program: &str, args: &[String]) -> Result<i32, CommandError>;
}

/// Executor backed by `std::process`, one blocking wait per call
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl SystemExecutor {
    /// Create a system executor
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CommandExecutor for SystemExecutor {
    fn execute(&self, program: &str, args: &[String]) -> Result<i32, CommandError> {
        debug!(program, ?args, "spawning configuration tool");
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|e| CommandError::spawn(program, e.to_string()))?;
        status
            .code()
            .ok_or_else(|| CommandError::signaled(program))
    }
}

/// Check if running as root (effective UID = 0).
///
/// Routing tables and firewall chains can only be edited with
/// CAP_NET_ADMIN, which in practice means root for this tool.
#[must_use]
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Test executor that records every invocation
///
/// Calls succeed with status 0 unless a scripted failure matches. A
/// failure is keyed by substring of the space-joined command line, so a
/// test can fail exactly one step of a multi-step sequence.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<Vec<String>>>,
    failures: Mutex<Vec<(String, i32)>>,
}

impl RecordingExecutor {
    /// Create a recorder where every call succeeds
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a non-zero status for command lines containing `needle`
    pub fn fail_when(&self, needle: impl Into<String>, status: i32) {
        self.failures.lock().push((needle.into(), status));
    }

    /// Every recorded argv, program first
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    /// Recorded invocations as space-joined command lines
    #[must_use]
    pub fn call_lines(&self) -> Vec<String> {
        self.calls.lock().iter().map(|argv| argv.join(" ")).collect()
    }

    /// Number of invocations so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, program: &str, args: &[String]) -> Result<i32, CommandError> {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(program.to_string());
        argv.extend(args.iter().cloned());
        let line = argv.join(" ");
        self.calls.lock().push(argv);

        for (needle, status) in self.failures.lock().iter() {
            if line.contains(needle.as_str()) {
                return Ok(*status);
            }
        }
        Ok(0)
    }
}
