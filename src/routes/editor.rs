//! Route table editor
//!
//! Routes live in the secondary table derived from the owning network's
//! id. Nothing here is retained as state beyond the per-network rule
//! count; every call translates directly into one `ip` invocation.

use std::sync::Arc;

use ipnet::IpNet;
use tracing::{debug, error, warn};

use crate::error::RouteError;
use crate::exec::{CommandExecutor, CommandSequencer, Family};
use crate::registry::NetworkRegistry;
use crate::response::{ResponseCode, ResponseSink};
use crate::rules::{RuleRefCounter, TableMap};

/// Direction of a route or rule edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteAction {
    Add,
    Del,
}

impl RouteAction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Del => "del",
        }
    }

    const fn is_add(self) -> bool {
        matches!(self, Self::Add)
    }
}

/// Editor for routes in per-network secondary tables
pub struct RouteEditor<E> {
    sequencer: Arc<CommandSequencer<E>>,
    registry: Arc<dyn NetworkRegistry>,
    counter: Arc<RuleRefCounter>,
    tables: TableMap,
}

impl<E: CommandExecutor> RouteEditor<E> {
    /// Create an editor over the shared control-plane state
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

    /// Add a route to the interface's secondary table
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidDestination`] if `dest`/`prefix` does
    /// not parse, [`RouteError::TableOutOfRange`] if the network maps
    /// past the last usable table, or [`RouteError::CommandFailed`] if
    /// the route tool exits non-zero. Command failures are also reported
    /// on `sink`, and the rule count is only updated on success.
    pub fn add_route(
        &self,
        sink: &dyn ResponseSink,
        iface: &str,
        dest: &str,
        prefix: u8,
        gateway: &str,
    ) -> Result<(), RouteError> {
        self.modify_route(sink, RouteAction::Add, iface, dest, prefix, gateway)
    }

    /// Remove a route from the interface's secondary table
    ///
    /// # Errors
    ///
    /// Same contract as [`RouteEditor::add_route`].
    pub fn remove_route(
        &self,
        sink: &dyn ResponseSink,
        iface: &str,
        dest: &str,
        prefix: u8,
        gateway: &str,
    ) -> Result<(), RouteError> {
        self.modify_route(sink, RouteAction::Del, iface, dest, prefix, gateway)
    }

    fn modify_route(
        &self,
        sink: &dyn ResponseSink,
        action: RouteAction,
        iface: &str,
        dest: &str,
        prefix: u8,
        gateway: &str,
    ) -> Result<(), RouteError> {
        let net_id = self.registry.network_id_of(iface);
        if !self.tables.in_range(net_id) {
            warn!(iface, net_id, "table index outside the usable range");
            return Err(RouteError::table_out_of_range(net_id));
        }
        let table = self.tables.mark_of(net_id);
        let dest_str = validated_destination(dest, prefix)?;

        // The route tool takes "::" badly as a gateway; it means no
        // gateway at all, so install a device-scoped route instead.
        let args: Vec<String> = if gateway == "::" {
            to_args(&["route", action.as_str(), &dest_str, "dev", iface, "table", &table])
        } else {
            to_args(&[
                "route",
                action.as_str(),
                &dest_str,
                "via",
                gateway,
                "dev",
                iface,
                "table",
                &table,
            ])
        };

        let status = self.sequencer.run_ip(&args);
        if status != 0 {
            error!(
                iface,
                dest = %dest_str,
                gateway,
                table = %table,
                "ip route {} failed",
                action.as_str()
            );
            sink.send(ResponseCode::OperationFailed, "ip route modification failed");
            return Err(RouteError::command_failed(status));
        }

        self.counter.update(net_id, action.is_add());
        sink.send(ResponseCode::CommandOkay, "Route modified");
        Ok(())
    }

    /// Add a source-address rule steering traffic from `addr` into the
    /// network's table
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::TableOutOfRange`] if the id maps past the
    /// last usable table, or [`RouteError::CommandFailed`] if the rule
    /// tool exits non-zero; the rule count is only updated on success.
    pub fn add_from_rule(&self, net_id: u32, addr: &str) -> Result<(), RouteError> {
        self.modify_from_rule(RouteAction::Add, net_id, addr)
    }

    /// Remove a source-address rule
    ///
    /// # Errors
    ///
    /// Same contract as [`RouteEditor::add_from_rule`].
    pub fn remove_from_rule(&self, net_id: u32, addr: &str) -> Result<(), RouteError> {
        self.modify_from_rule(RouteAction::Del, net_id, addr)
    }

    fn modify_from_rule(
        &self,
        action: RouteAction,
        net_id: u32,
        addr: &str,
    ) -> Result<(), RouteError> {
        if !self.tables.in_range(net_id) {
            warn!(net_id, addr, "table index outside the usable range");
            return Err(RouteError::table_out_of_range(net_id));
        }
        let table = self.tables.mark_of(net_id);
        let family = Family::of_addr(addr);
        let args = to_args(&[
            family.ip_flag(),
            "rule",
            action.as_str(),
            "from",
            addr,
            "table",
            &table,
        ]);

        let status = self.sequencer.run_ip(&args);
        if status != 0 {
            warn!(net_id, addr, table = %table, "from rule {} failed", action.as_str());
            return Err(RouteError::command_failed(status));
        }

        self.counter.update(net_id, action.is_add());
        Ok(())
    }

    /// Add a local subnet route in the network's table
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::TableOutOfRange`] if the id maps past the
    /// last usable table, or [`RouteError::CommandFailed`] if the route
    /// tool exits non-zero. Unlike the other editors, the rule count has
    /// already been updated when a command failure returns; see
    /// [`RouteEditor::remove_local_route`].
    pub fn add_local_route(&self, net_id: u32, iface: &str, addr: &str) -> Result<(), RouteError> {
        self.modify_local_route(RouteAction::Add, net_id, iface, addr)
    }

    /// Remove a local subnet route from the network's table
    ///
    /// The count is updated before the external call on purpose: during
    /// teardown the interface may already be gone and the delete will
    /// fail, but the rule must still stop being accounted for.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::TableOutOfRange`] if the id maps past the
    /// last usable table, or [`RouteError::CommandFailed`] if the route
    /// tool exits non-zero.
    pub fn remove_local_route(
        &self,
        net_id: u32,
        iface: &str,
        addr: &str,
    ) -> Result<(), RouteError> {
        self.modify_local_route(RouteAction::Del, net_id, iface, addr)
    }

    // Counts first, then runs the command. Some deletes will fail
    // because the interface is already gone; the count must not drift
    // when that happens. Keep this path separate from modify_route.
    fn modify_local_route(
        &self,
        action: RouteAction,
        net_id: u32,
        iface: &str,
        addr: &str,
    ) -> Result<(), RouteError> {
        if !self.tables.in_range(net_id) {
            warn!(net_id, iface, "table index outside the usable range");
            return Err(RouteError::table_out_of_range(net_id));
        }
        self.counter.update(net_id, action.is_add());

        let table = self.tables.mark_of(net_id);
        let args = to_args(&[
            "route",
            action.as_str(),
            addr,
            "dev",
            iface,
            "table",
            &table,
        ]);

        let status = self.sequencer.run_ip(&args);
        if status != 0 {
            debug!(net_id, iface, addr, "local route {} exited {status}", action.as_str());
            return Err(RouteError::command_failed(status));
        }
        Ok(())
    }
}

fn validated_destination(dest: &str, prefix: u8) -> Result<String, RouteError> {
    let dest_str = format!("{dest}/{prefix}");
    dest_str
        .parse::<IpNet>()
        .map_err(|_| RouteError::invalid_destination(dest, prefix))?;
    Ok(dest_str)
}

fn to_args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(ToString::to_string).collect()
}
