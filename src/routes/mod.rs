//! Secondary table route editing
//!
//! Adds and removes individual routes in a network's secondary table,
//! including the source-address and local-route rule variants that VPN
//! bring-up and teardown use.

mod editor;

pub use editor::RouteEditor;
