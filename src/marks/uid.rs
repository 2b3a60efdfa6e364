//! Uid range rules
//!
//! Binds a uid range to a network and mirrors the binding with a
//! firewall redirect: traffic owned by the range goes through the
//! interface's chain. The registry binding is the authoritative
//! enforcement point, so it runs first and gates the firewall change;
//! if the registry refuses, nothing is touched.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::chain::{iface_chain_name, MANGLE_OUTPUT_CHAIN};
use crate::error::RuleError;
use crate::exec::{CommandExecutor, CommandSequencer, Target};
use crate::registry::{NetworkRegistry, NETID_UNSET};

/// Manages uid-range to network bindings and their firewall redirects
pub struct UidRuleManager<E> {
    sequencer: Arc<CommandSequencer<E>>,
    registry: Arc<dyn NetworkRegistry>,
}

impl<E: CommandExecutor> UidRuleManager<E> {
    /// Create a manager over the shared control-plane state
    pub fn new(sequencer: Arc<CommandSequencer<E>>, registry: Arc<dyn NetworkRegistry>) -> Self {
        Self {
            sequencer,
            registry,
        }
    }

    /// Bind a uid range to the interface's network
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::UidBinding`] if the registry refuses the
    /// binding (no firewall change is made), or
    /// [`RuleError::CommandFailed`] if the redirect rule fails.
    pub fn add_uid_rule(&self, iface: &str, uid_start: i32, uid_end: i32) -> Result<(), RuleError> {
        self.set_uid_rule(iface, uid_start, uid_end, true)
    }

    /// Unbind a uid range from the interface's network
    ///
    /// The registry unbind gates the firewall change the same way the
    /// bind does: a refused unbind aborts with the redirect left in
    /// place.
    ///
    /// # Errors
    ///
    /// Same contract as [`UidRuleManager::add_uid_rule`].
    pub fn remove_uid_rule(
        &self,
        iface: &str,
        uid_start: i32,
        uid_end: i32,
    ) -> Result<(), RuleError> {
        self.set_uid_rule(iface, uid_start, uid_end, false)
    }

    fn set_uid_rule(
        &self,
        iface: &str,
        uid_start: i32,
        uid_end: i32,
        add: bool,
    ) -> Result<(), RuleError> {
        let net_id = self.registry.network_id_of(iface);
        let bind_net = if add { net_id } else { NETID_UNSET };
        if !self
            .registry
            .bind_uid_range(uid_start, uid_end, bind_net, false)
        {
            warn!(iface, uid_start, uid_end, "registry refused uid binding");
            return Err(RuleError::uid_binding(uid_start, uid_end));
        }
        debug!(iface, net_id, uid_start, uid_end, add, "uid range bound");

        let uid_range = format!("{uid_start}-{uid_end}");
        let chain = iface_chain_name(iface);
        let outcome = self.sequencer.run_iptables(
            Target::Both,
            &[
                "-t".into(),
                "mangle".into(),
                if add { "-A" } else { "-D" }.into(),
                MANGLE_OUTPUT_CHAIN.into(),
                "-m".into(),
                "owner".into(),
                "--uid-owner".into(),
                uid_range,
                "-g".into(),
                chain,
            ],
        );
        if !outcome.ok() {
            warn!(iface, status = outcome.status(), "uid redirect rule failed");
            return Err(RuleError::command_failed(outcome.status()));
        }
        Ok(())
    }
}
