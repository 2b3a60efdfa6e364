//! Host exemptions
//!
//! Exempts traffic to a single host from interface-based marking, for
//! endpoints that must stay reachable over the host's own routes (a
//! tunnel server, for one). Two pieces per host: a protect-mark rule in
//! the exempt chain, and a high-priority policy rule steering the host
//! through the main table. Both are attempted even when the first
//! fails, and their statuses are combined.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::chain::MANGLE_EXEMPT_CHAIN;
use crate::error::RuleError;
use crate::exec::{CommandExecutor, CommandSequencer, Family};
use crate::rules::{EXEMPT_PRIORITY, PROTECT_MARK};

/// Manages per-host exemptions from fwmark routing
pub struct HostExemptionManager<E> {
    sequencer: Arc<CommandSequencer<E>>,
}

impl<E: CommandExecutor> HostExemptionManager<E> {
    /// Create a manager issuing commands through the given sequencer
    pub fn new(sequencer: Arc<CommandSequencer<E>>) -> Self {
        Self { sequencer }
    }

    /// Exempt a host address from fwmark routing
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::CommandFailed`] carrying the combined
    /// status when either the mark rule or the policy rule fails.
    pub fn add_host_exemption(&self, host: &str) -> Result<(), RuleError> {
        self.set_host_exemption(host, true)
    }

    /// Drop a host's exemption
    ///
    /// # Errors
    ///
    /// Same contract as [`HostExemptionManager::add_host_exemption`].
    pub fn remove_host_exemption(&self, host: &str) -> Result<(), RuleError> {
        self.set_host_exemption(host, false)
    }

    fn set_host_exemption(&self, host: &str, add: bool) -> Result<(), RuleError> {
        let family = Family::of_addr(host);
        let protect = PROTECT_MARK.to_string();
        let mut status = self
            .sequencer
            .run_iptables(
                family.into(),
                &[
                    "-t".into(),
                    "mangle".into(),
                    if add { "-A" } else { "-D" }.into(),
                    MANGLE_EXEMPT_CHAIN.into(),
                    "-d".into(),
                    host.into(),
                    "-j".into(),
                    "MARK".into(),
                    "--set-mark".into(),
                    protect,
                ],
            )
            .status();

        status |= self.sequencer.run_ip(&[
            family.ip_flag().into(),
            "rule".into(),
            if add { "add" } else { "del" }.into(),
            "prio".into(),
            EXEMPT_PRIORITY.to_string(),
            "to".into(),
            host.into(),
            "table".into(),
            "main".into(),
        ]);

        if status != 0 {
            warn!(host, add, status, "host exemption change failed");
            return Err(RuleError::command_failed(status));
        }
        debug!(host, add, "host exemption updated");
        Ok(())
    }
}
