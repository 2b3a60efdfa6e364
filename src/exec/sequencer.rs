//! Family fan-out for configuration commands
//!
//! Firewall changes usually apply to both address families: the same
//! argument vector is run once through `iptables` and once through
//! `ip6tables`, IPv4 first. The two exit statuses are kept separately
//! in a [`SequenceOutcome`] and collapsed with bitwise OR for callers
//! that only need the combined pass/fail.
//!
//! Route and rule changes go through the `ip` tool a single call at a
//! time; any family selector (`-4`/`-6`) travels inline in the argument
//! vector because it depends on the address being configured.

use tracing::warn;

use crate::config::ToolsConfig;

use super::CommandExecutor;

/// Address family of a single configuration call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Family selector flag for the `ip` tool
    #[must_use]
    pub const fn ip_flag(self) -> &'static str {
        match self {
            Self::V4 => "-4",
            Self::V6 => "-6",
        }
    }

    /// Family of a textual address (a `:` means IPv6)
    #[must_use]
    pub fn of_addr(addr: &str) -> Self {
        if addr.contains(':') {
            Self::V6
        } else {
            Self::V4
        }
    }
}

/// Which firewall tools one logical operation expands to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    V4,
    V6,
    Both,
}

impl Target {
    /// Families to invoke, in invocation order
    #[must_use]
    pub fn families(self) -> &'static [Family] {
        match self {
            Self::V4 => &[Family::V4],
            Self::V6 => &[Family::V6],
            Self::Both => &[Family::V4, Family::V6],
        }
    }
}

impl From<Family> for Target {
    fn from(family: Family) -> Self {
        match family {
            Family::V4 => Self::V4,
            Family::V6 => Self::V6,
        }
    }
}

/// Per-family exit statuses of one firewall operation
///
/// `status()` is the public contract (OR of whatever ran); the fields
/// stay inspectable so logs and tests can tell which family failed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SequenceOutcome {
    pub v4: Option<i32>,
    pub v6: Option<i32>,
}

impl SequenceOutcome {
    /// Combined exit status: bitwise OR of the statuses that ran
    #[must_use]
    pub fn status(self) -> i32 {
        self.v4.unwrap_or(0) | self.v6.unwrap_or(0)
    }

    /// Whether every invocation exited zero
    #[must_use]
    pub fn ok(self) -> bool {
        self.status() == 0
    }
}

/// Runs configuration tools through an executor, fanning out by family
///
/// Each call is spawn-and-wait with no retry and no timeout. A spawn
/// failure is collapsed into a conventional status of 1 so multi-step
/// sequences treat a missing tool like any other failed step.
#[derive(Debug)]
pub struct CommandSequencer<E> {
    executor: std::sync::Arc<E>,
    tools: ToolsConfig,
}

impl<E: CommandExecutor> CommandSequencer<E> {
    /// Create a sequencer over an executor and tool paths
    pub fn new(executor: std::sync::Arc<E>, tools: ToolsConfig) -> Self {
        Self { executor, tools }
    }

    /// The executor behind this sequencer
    #[must_use]
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run the route tool once and return its exit status
    pub fn run_ip(&self, args: &[String]) -> i32 {
        self.run_tool(&self.tools.ip_path, args)
    }

    /// Run the firewall tool once per family in `target`
    pub fn run_iptables(&self, target: Target, args: &[String]) -> SequenceOutcome {
        let mut outcome = SequenceOutcome::default();
        for family in target.families() {
            let program = match family {
                Family::V4 => &self.tools.iptables_path,
                Family::V6 => &self.tools.ip6tables_path,
            };
            let status = self.run_tool(program, args);
            match family {
                Family::V4 => outcome.v4 = Some(status),
                Family::V6 => outcome.v6 = Some(status),
            }
        }
        outcome
    }

    fn run_tool(&self, program: &str, args: &[String]) -> i32 {
        match self.executor.execute(program, args) {
            Ok(status) => status,
            Err(e) => {
                warn!(program, error = %e, "configuration tool did not run");
                1
            }
        }
    }
}
