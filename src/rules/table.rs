//! Table index and mark derivation
//!
//! Every logical network gets a dedicated secondary routing table, and the
//! table index doubles as the fwmark value carried by packets that should
//! be routed through it. The mapping is a fixed offset:
//!
//! ```text
//! table index = net id + base
//! ```
//!
//! The base defaults to [`DEFAULT_BASE_TABLE_INDEX`] and is configurable
//! per deployment. Indices must stay below the reserved kernel tables
//! (253 default, 254 main, 255 local), so the usable ceiling is
//! [`MAX_TABLE_INDEX`].
//!
//! Route-selection rule priorities are fixed: exemption rules run at
//! [`EXEMPT_PRIORITY`], one step ahead of the fwmark rules at
//! [`RULE_PRIORITY`], so exempted hosts are matched before any
//! per-network table is consulted.

/// Default offset added to a network id to form its table index
pub const DEFAULT_BASE_TABLE_INDEX: u32 = 60;

/// Highest usable table index (253-255 are reserved by the kernel)
pub const MAX_TABLE_INDEX: u32 = 252;

/// Mark value that routes traffic around all secondary tables
pub const PROTECT_MARK: u32 = 0x1;

/// Priority of fwmark-to-table route selection rules
pub const RULE_PRIORITY: u32 = 100;

/// Priority of host exemption rules (checked before fwmark rules)
pub const EXEMPT_PRIORITY: u32 = 99;

/// Network id to table index mapping with a configurable base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableMap {
    base: u32,
}

impl TableMap {
    /// Create a mapping with the given base offset
    #[must_use]
    pub const fn new(base: u32) -> Self {
        Self { base }
    }

    /// The configured base offset
    #[must_use]
    pub const fn base(self) -> u32 {
        self.base
    }

    /// Table index for a network id
    #[must_use]
    pub const fn table_index_of(self, net_id: u32) -> u32 {
        net_id + self.base
    }

    /// Mark value for a network id, as the decimal string the external
    /// tools take on their command lines
    #[must_use]
    pub fn mark_of(self, net_id: u32) -> String {
        self.table_index_of(net_id).to_string()
    }

    /// Whether the network id maps below the reserved table region
    #[must_use]
    pub const fn in_range(self, net_id: u32) -> bool {
        match net_id.checked_add(self.base) {
            Some(table) => table <= MAX_TABLE_INDEX,
            None => false,
        }
    }
}

impl Default for TableMap {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_TABLE_INDEX)
    }
}

/// Table index for a network id under the default base
#[must_use]
pub const fn table_index_of(net_id: u32) -> u32 {
    net_id + DEFAULT_BASE_TABLE_INDEX
}
