//! Table mapping and rule accounting
//!
//! This module provides the two pieces of state every rule manager
//! shares:
//!
//! - [`TableMap`]: network id to routing table index (and mark value)
//! - [`RuleRefCounter`]: per-network count of active policy rules
//!
//! The table index doubles as the fwmark value, so a packet marked for a
//! network is steered into that network's table by a single fwmark rule.

pub mod refcount;
pub mod table;

pub use refcount::RuleRefCounter;
pub use table::{
    table_index_of, TableMap, DEFAULT_BASE_TABLE_INDEX, EXEMPT_PRIORITY, MAX_TABLE_INDEX,
    PROTECT_MARK, RULE_PRIORITY,
};
