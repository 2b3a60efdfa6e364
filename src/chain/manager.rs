//! `FwmarkRuleManager` - per-network fwmark infrastructure lifecycle
//!
//! This is the central state machine of the control plane. A network is
//! Inactive until its interface's fwmark rule set is installed, then
//! Active until the last rule referencing it is removed. Activation is
//! a strictly ordered sequence of external calls:
//!
//! 1. default routes into the table (v4 and v6; failures tolerated)
//! 2. fwmark-to-table rules at a fixed priority (failure aborts)
//! 3. per-interface chain creation and OUTPUT wiring
//! 4. IPv4 NAT masquerade (failure aborts)
//! 5. IPv6 NAT masquerade, with a REJECT fallback for kernels without
//!    IPv6 NAT
//!
//! The table and mark bindings must exist before the chain is wired
//! into OUTPUT, otherwise marked packets could be steered into an empty
//! table. Teardown unhooks the chain before flushing and deleting it;
//! the firewall refuses to delete a hooked or non-empty chain.
//!
//! There is no rollback: a step that fails mid-sequence leaves the
//! earlier steps applied, and the failure is surfaced to the caller.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::RuleError;
use crate::exec::{CommandExecutor, CommandSequencer, Target};
use crate::registry::NetworkRegistry;
use crate::rules::{RuleRefCounter, TableMap, PROTECT_MARK, RULE_PRIORITY};

use super::{
    iface_chain_name, FILTER_OUTPUT_CHAIN, MANGLE_EXEMPT_CHAIN, MANGLE_OUTPUT_CHAIN,
    NAT_POSTROUTING_CHAIN, OUTPUT_INSERT_POSITION,
};

/// Manages per-network fwmark rules and the chains that carry them
pub struct FwmarkRuleManager<E> {
    sequencer: Arc<CommandSequencer<E>>,
    registry: Arc<dyn NetworkRegistry>,
    counter: Arc<RuleRefCounter>,
    tables: TableMap,
}

impl<E: CommandExecutor> FwmarkRuleManager<E> {
    /// Create a manager over the shared control-plane state
    pub fn new(
        sequencer: Arc<CommandSequencer<E>>,
        registry: Arc<dyn NetworkRegistry>,
        counter: Arc<RuleRefCounter>,
        tables: TableMap,
    ) -> Self {
        Self {
            sequencer,
            registry,
            counter,
            tables,
        }
    }

    /// Prepare the global hook chains
    ///
    /// Flushes the OUTPUT mangle hook and the exemption chain, then
    /// installs the two standing bypasses: protect-marked packets and
    /// the legacy vpn daemon's own traffic return to ordinary routing
    /// before any redirect can match.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::CommandFailed`] with the OR-combined status
    /// if any of the four steps exits non-zero.
    pub fn setup_hooks(&self) -> Result<(), RuleError> {
        debug!("preparing policy hook chains");
        let mut status = self
            .sequencer
            .run_iptables(Target::Both, &to_args(&["-t", "mangle", "-F", MANGLE_OUTPUT_CHAIN]))
            .status();
        status |= self
            .sequencer
            .run_iptables(Target::Both, &to_args(&["-t", "mangle", "-F", MANGLE_EXEMPT_CHAIN]))
            .status();

        let protect = PROTECT_MARK.to_string();
        status |= self
            .sequencer
            .run_iptables(
                Target::Both,
                &to_args(&[
                    "-t",
                    "mangle",
                    "-A",
                    MANGLE_OUTPUT_CHAIN,
                    "-m",
                    "mark",
                    "--mark",
                    &protect,
                    "-j",
                    "RETURN",
                ]),
            )
            .status();

        status |= self
            .sequencer
            .run_iptables(
                Target::Both,
                &to_args(&[
                    "-t",
                    "mangle",
                    "-A",
                    MANGLE_OUTPUT_CHAIN,
                    "-m",
                    "owner",
                    "--uid-owner",
                    "vpn",
                    "-j",
                    "RETURN",
                ]),
            )
            .status();

        if status != 0 {
            warn!(status, "hook chain setup left failures behind");
            return Err(RuleError::command_failed(status));
        }
        info!("policy hook chains ready");
        Ok(())
    }

    /// Install the fwmark rule set for an interface
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Busy`] if the interface's network already
    /// has active rules, [`RuleError::TableOutOfRange`] if its table
    /// index would land in the reserved region, or
    /// [`RuleError::CommandFailed`] if a fatal step of the sequence
    /// fails.
    pub fn add_fwmark_rule(&self, iface: &str) -> Result<(), RuleError> {
        self.set_fwmark_rule(iface, true)
    }

    /// Remove the fwmark rule set for an interface
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::TableOutOfRange`] if the network's table
    /// index would land in the reserved region, or
    /// [`RuleError::CommandFailed`] if a fatal step of the teardown
    /// sequence fails.
    pub fn remove_fwmark_rule(&self, iface: &str) -> Result<(), RuleError> {
        self.set_fwmark_rule(iface, false)
    }

    fn set_fwmark_rule(&self, iface: &str, add: bool) -> Result<(), RuleError> {
        let net_id = self.registry.network_id_of(iface);

        // Past the cap the index lands in the kernel's reserved tables
        // (253 default, 254 main, 255 local). Never write there.
        if !self.tables.in_range(net_id) {
            warn!(iface, net_id, "table index outside the usable range");
            return Err(RuleError::table_out_of_range(net_id));
        }

        // Re-initializing a network that already has live rules would
        // clobber them; refuse before issuing any external call.
        if add && self.counter.active(net_id) {
            debug!(iface, net_id, "fwmark rules already active");
            return Err(RuleError::busy(net_id));
        }

        let mark = self.tables.mark_of(net_id);
        let action = if add { "add" } else { "del" };
        debug!(iface, net_id, table = %mark, action, "fwmark rule transition");

        // Catch-all defaults so the table is never consulted empty.
        // Tolerated on failure: the interface may have no v6 at all.
        let status = self
            .sequencer
            .run_ip(&to_args(&["route", action, "default", "dev", iface, "table", &mark]));
        if status != 0 {
            debug!(iface, status, "v4 default route {action} skipped");
        }
        let status = self
            .sequencer
            .run_ip(&to_args(&["-6", "route", action, "default", "dev", iface, "table", &mark]));
        if status != 0 {
            debug!(iface, status, "v6 default route {action} skipped");
        }

        // Mark-to-table bindings. Without these nothing ever reaches
        // the table, so a failure here aborts the sequence.
        let priority = RULE_PRIORITY.to_string();
        let status = self.sequencer.run_ip(&to_args(&[
            "rule", action, "prio", &priority, "fwmark", &mark, "table", &mark,
        ]));
        if status != 0 {
            warn!(iface, status, "v4 fwmark rule {action} failed");
            return Err(RuleError::command_failed(status));
        }
        let status = self.sequencer.run_ip(&to_args(&[
            "-6", "rule", action, "prio", &priority, "fwmark", &mark, "table", &mark,
        ]));
        if status != 0 {
            warn!(iface, status, "v6 fwmark rule {action} failed");
            return Err(RuleError::command_failed(status));
        }

        let status = self.wire_chain(iface, &mark, add);
        if status != 0 {
            warn!(iface, status, "chain wiring left failures behind");
        }

        // Source rewriting for the marked traffic.
        let nat_args = to_args(&[
            "-t",
            "nat",
            if add { "-A" } else { "-D" },
            NAT_POSTROUTING_CHAIN,
            "-o",
            iface,
            "-m",
            "mark",
            "--mark",
            &mark,
            "-j",
            "MASQUERADE",
        ]);
        let outcome = self.sequencer.run_iptables(Target::V4, &nat_args);
        if !outcome.ok() {
            warn!(iface, status = outcome.status(), "v4 masquerade {action} failed");
            return Err(RuleError::command_failed(outcome.status()));
        }

        // IPv6 NAT only exists on kernels 3.7 and later. Where it is
        // missing, reject marked v6 output outright rather than let it
        // leak around the secondary table.
        let outcome = self.sequencer.run_iptables(Target::V6, &nat_args);
        let final_status = if outcome.ok() {
            0
        } else {
            debug!(iface, "v6 masquerade unavailable, falling back to reject");
            self.sequencer
                .run_iptables(
                    Target::V6,
                    &to_args(&[
                        "-t",
                        "filter",
                        if add { "-A" } else { "-D" },
                        FILTER_OUTPUT_CHAIN,
                        "-m",
                        "mark",
                        "--mark",
                        &mark,
                        "-j",
                        "REJECT",
                    ]),
                )
                .status()
        };
        if final_status != 0 {
            warn!(iface, status = final_status, "v6 reject fallback {action} failed");
            return Err(RuleError::command_failed(final_status));
        }

        self.counter.update(net_id, add);
        let verb = if add { "installed" } else { "removed" };
        info!(iface, net_id, table = %mark, "fwmark rules {verb}");
        Ok(())
    }

    fn wire_chain(&self, iface: &str, mark: &str, add: bool) -> i32 {
        let chain = iface_chain_name(iface);
        let redirect_args = |flag: &str, position: Option<&str>| {
            let mut args = to_args(&["-t", "mangle", flag, MANGLE_OUTPUT_CHAIN]);
            if let Some(position) = position {
                args.push(position.to_string());
            }
            args.extend(to_args(&["-m", "mark", "--mark", mark, "-g", &chain]));
            args
        };

        if add {
            let mut status = self
                .sequencer
                .run_iptables(Target::Both, &to_args(&["-t", "mangle", "-N", &chain]))
                .status();
            // The redirect sits ahead of the uid rules so premarked
            // packets reach the chain first.
            let position = OUTPUT_INSERT_POSITION.to_string();
            status |= self
                .sequencer
                .run_iptables(Target::Both, &redirect_args("-I", Some(&position)))
                .status();
            // Fall-through clears the mark: a packet that matches no
            // route in the chain should hit the network normally
            // instead of staying pinned to this table.
            status |= self
                .sequencer
                .run_iptables(
                    Target::Both,
                    &to_args(&["-t", "mangle", "-A", &chain, "-j", "MARK", "--set-mark", "0"]),
                )
                .status();
            status
        } else {
            // Unhook first, then flush, then delete. The chain must be
            // unreferenced and empty before -X succeeds.
            let mut status = self
                .sequencer
                .run_iptables(Target::Both, &redirect_args("-D", None))
                .status();
            status |= self
                .sequencer
                .run_iptables(Target::Both, &to_args(&["-t", "mangle", "-F", &chain]))
                .status();
            status |= self
                .sequencer
                .run_iptables(Target::Both, &to_args(&["-t", "mangle", "-X", &chain]))
                .status();
            status
        }
    }
}

fn to_args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(ToString::to_string).collect()
}
