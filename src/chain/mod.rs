//! Per-interface firewall chain management
//!
//! Every interface carrying a secondary network gets its own mangle
//! chain wired into the global OUTPUT hook. Packets marked for the
//! network are redirected into it; destination rules inside it set the
//! mark, and a trailing rule clears the mark again so unmatched traffic
//! falls back to ordinary routing.
//!
//! # Chain layout
//!
//! ```text
//! st_mangle_OUTPUT (hooked from OUTPUT)
//!   1. -m mark --mark 0x1        -j RETURN    protect-mark bypass
//!   2. -m owner --uid-owner vpn  -j RETURN    legacy daemon bypass
//!   3. -m mark --mark <table>    -g st_mangle_<iface>_OUTPUT
//!   4. -m owner --uid-owner a-b  -g st_mangle_<iface>_OUTPUT  (uid rules)
//!
//! st_mangle_<iface>_OUTPUT
//!   -d <dest>/<prefix> -j MARK --set-mark <table>   (destination marks)
//!   -j MARK --set-mark 0                            (fall-through clear)
//! ```
//!
//! Chain creation and deletion belong to [`FwmarkRuleManager`] alone;
//! other managers only append rules to chains that already exist.

pub mod manager;

pub use manager::FwmarkRuleManager;

/// Global mangle chain hooked into OUTPUT
pub const MANGLE_OUTPUT_CHAIN: &str = "st_mangle_OUTPUT";

/// Mangle chain holding host exemption marks
pub const MANGLE_EXEMPT_CHAIN: &str = "st_mangle_EXEMPT";

/// NAT chain hooked into POSTROUTING
pub const NAT_POSTROUTING_CHAIN: &str = "st_nat_POSTROUTING";

/// Filter chain hooked into OUTPUT, used for the IPv6 NAT fallback
pub const FILTER_OUTPUT_CHAIN: &str = "st_filter_OUTPUT";

/// Position of the per-interface redirect in [`MANGLE_OUTPUT_CHAIN`],
/// directly after the two RETURN rules and ahead of any uid rules
pub const OUTPUT_INSERT_POSITION: u32 = 3;

/// Mangle chain name for an interface
#[must_use]
pub fn iface_chain_name(iface: &str) -> String {
    format!("st_mangle_{iface}_OUTPUT")
}
