//! Network identity registry interface
//!
//! The registry is the external authority for network ids: it resolves
//! which network an interface belongs to, enforces uid-range to network
//! assignment at the kernel level, and answers which network a uid is
//! currently bound to. This subsystem never allocates ids itself.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Sentinel network id meaning "no network"
pub const NETID_UNSET: u32 = 0;

/// Sentinel pid for queries not tied to a process
pub const PID_UNSPECIFIED: i32 = 0;

/// External network-identity authority
pub trait NetworkRegistry: Send + Sync {
    /// Network id the interface belongs to ([`NETID_UNSET`] if unknown)
    fn network_id_of(&self, iface: &str) -> u32;

    /// Bind a uid range to a network, or unbind it when `net_id` is
    /// [`NETID_UNSET`]. Returns false if the registry refuses.
    fn bind_uid_range(&self, uid_start: i32, uid_end: i32, net_id: u32, forward_dns: bool) -> bool;

    /// Network currently assigned to a uid
    fn network_of_uid(&self, uid: i32, net_id_hint: u32, pid_hint: i32, for_dns: bool) -> u32;
}

/// Fixed-map registry for tests and single-host embedding
///
/// Interfaces map to ids through an explicit table; uid ranges are kept
/// in a second table that [`NetworkRegistry::network_of_uid`] scans.
/// Bindings can be made to fail on demand to exercise abort paths.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    networks: Mutex<HashMap<String, u32>>,
    uid_ranges: Mutex<HashMap<(i32, i32), u32>>,
    refuse_bindings: Mutex<bool>,
}

impl StaticRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interface under a network id
    pub fn insert_network(&self, iface: impl Into<String>, net_id: u32) {
        self.networks.lock().insert(iface.into(), net_id);
    }

    /// Make subsequent uid bindings fail (or succeed again)
    pub fn refuse_uid_bindings(&self, refuse: bool) {
        *self.refuse_bindings.lock() = refuse;
    }

    /// Number of uid ranges currently bound
    #[must_use]
    pub fn bound_range_count(&self) -> usize {
        self.uid_ranges.lock().len()
    }
}

impl NetworkRegistry for StaticRegistry {
    fn network_id_of(&self, iface: &str) -> u32 {
        self.networks
            .lock()
            .get(iface)
            .copied()
            .unwrap_or(NETID_UNSET)
    }

    fn bind_uid_range(
        &self,
        uid_start: i32,
        uid_end: i32,
        net_id: u32,
        _forward_dns: bool,
    ) -> bool {
        if *self.refuse_bindings.lock() {
            return false;
        }
        let mut ranges = self.uid_ranges.lock();
        if net_id == NETID_UNSET {
            ranges.remove(&(uid_start, uid_end));
        } else {
            ranges.insert((uid_start, uid_end), net_id);
        }
        true
    }

    fn network_of_uid(&self, uid: i32, _net_id_hint: u32, _pid_hint: i32, _for_dns: bool) -> u32 {
        self.uid_ranges
            .lock()
            .iter()
            .find(|((start, end), _)| *start <= uid && uid <= *end)
            .map_or(NETID_UNSET, |(_, net_id)| *net_id)
    }
}
