//! Destination mark rules
//!
//! Marks packets destined to specific addresses with their network's
//! mark so they take the per-interface chain's routed path. One rule
//! per destination, one family per rule; a destination is inherently
//! v4 or v6, so there is no dual-stack fan-out here.

use std::sync::Arc;

use ipnet::IpNet;
use tracing::warn;

use crate::chain::iface_chain_name;
use crate::error::RuleError;
use crate::exec::{CommandExecutor, CommandSequencer, Family, Target};
use crate::registry::NetworkRegistry;
use crate::rules::TableMap;

/// Manages destination-to-mark rules inside per-interface chains
pub struct DestinationMarkManager<E> {
    sequencer: Arc<CommandSequencer<E>>,
    registry: Arc<dyn NetworkRegistry>,
    tables: TableMap,
}

impl<E: CommandExecutor> DestinationMarkManager<E> {
    /// Create a manager over the shared control-plane state
    pub fn new(
        sequencer: Arc<CommandSequencer<E>>,
        registry: Arc<dyn NetworkRegistry>,
        tables: TableMap,
    ) -> Self {
        Self {
            sequencer,
            registry,
            tables,
        }
    }

    /// Mark traffic to `dest/prefix` for the interface's network
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidDestination`] if the destination does
    /// not parse, [`RuleError::TableOutOfRange`] if the network maps
    /// past the last usable table, or [`RuleError::CommandFailed`] if
    /// the firewall tool exits non-zero.
    pub fn add_fwmark_route(&self, iface: &str, dest: &str, prefix: u8) -> Result<(), RuleError> {
        self.set_fwmark_route(iface, dest, prefix, true)
    }

    /// Remove a destination mark rule
    ///
    /// # Errors
    ///
    /// Same contract as [`DestinationMarkManager::add_fwmark_route`].
    pub fn remove_fwmark_route(
        &self,
        iface: &str,
        dest: &str,
        prefix: u8,
    ) -> Result<(), RuleError> {
        self.set_fwmark_route(iface, dest, prefix, false)
    }

    fn set_fwmark_route(
        &self,
        iface: &str,
        dest: &str,
        prefix: u8,
        add: bool,
    ) -> Result<(), RuleError> {
        let net_id = self.registry.network_id_of(iface);
        if !self.tables.in_range(net_id) {
            warn!(iface, net_id, "table index outside the usable range");
            return Err(RuleError::table_out_of_range(net_id));
        }
        let mark = self.tables.mark_of(net_id);
        let chain = iface_chain_name(iface);

        let dest_str = format!("{dest}/{prefix}");
        dest_str
            .parse::<IpNet>()
            .map_err(|_| RuleError::invalid_destination(dest, prefix))?;

        let target = Target::from(Family::of_addr(dest));
        let outcome = self.sequencer.run_iptables(
            target,
            &[
                "-t".into(),
                "mangle".into(),
                if add { "-A" } else { "-D" }.into(),
                chain,
                "-d".into(),
                dest_str,
                "-j".into(),
                "MARK".into(),
                "--set-mark".into(),
                mark,
            ],
        );
        if !outcome.ok() {
            warn!(iface, dest, prefix, status = outcome.status(), "destination mark rule failed");
            return Err(RuleError::command_failed(outcome.status()));
        }
        Ok(())
    }
}
