//! Per-network active rule counting
//!
//! Each network's policy rules are reference counted so the first rule
//! can create shared infrastructure and the last one can tear it down.
//! The map holds no zero entries: a network is either absent (inactive)
//! or present with a count of at least one.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Reference counter for active policy rules, keyed by network id
///
/// All read-modify-write sequences run under one mutex. Callers that
/// interleave add/remove for the same interface across threads must
/// still serialize those operations themselves; only the individual
/// counter updates are protected here.
#[derive(Debug, Default)]
pub struct RuleRefCounter {
    counts: Mutex<HashMap<u32, u32>>,
}

impl RuleRefCounter {
    /// Create an empty counter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more active rule for the network
    pub fn increment(&self, net_id: u32) {
        let mut counts = self.counts.lock();
        *counts.entry(net_id).or_insert(0) += 1;
    }

    /// Record one less active rule for the network
    ///
    /// A decrement on an absent entry is a no-op. An entry that drops
    /// below one is removed in the same critical section.
    pub fn decrement(&self, net_id: u32) {
        let mut counts = self.counts.lock();
        if let Some(count) = counts.get_mut(&net_id) {
            *count -= 1;
            if *count < 1 {
                counts.remove(&net_id);
            }
        }
    }

    /// Apply an add or remove to the count
    pub fn update(&self, net_id: u32, add: bool) {
        if add {
            self.increment(net_id);
        } else {
            self.decrement(net_id);
        }
    }

    /// Number of active rules for the network (0 if absent)
    #[must_use]
    pub fn count(&self, net_id: u32) -> u32 {
        self.counts.lock().get(&net_id).copied().unwrap_or(0)
    }

    /// Whether any rule is active for the network
    #[must_use]
    pub fn active(&self, net_id: u32) -> bool {
        self.count(net_id) > 0
    }
}
