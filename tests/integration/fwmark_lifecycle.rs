//! Interface attach/detach lifecycle tests
//!
//! This module drives the full fwmark rule lifecycle through a
//! recording executor: hook preparation, per-interface activation, the
//! busy guard against double activation, and teardown back to a clean
//! state.
//!
//! # Background
//!
//! Activating an interface expands into an ordered batch of external
//! calls (default routes, fwmark rules, chain wiring, NAT), and the
//! reference counter flips a network between Inactive and Active only
//! when the whole batch lands. These tests verify the transitions as a
//! caller would observe them, across several managers sharing state.

use std::sync::Arc;

use netmark_router::chain::FwmarkRuleManager;
use netmark_router::config::ToolsConfig;
use netmark_router::error::RuleError;
use netmark_router::exec::{CommandSequencer, RecordingExecutor};
use netmark_router::registry::StaticRegistry;
use netmark_router::rules::{RuleRefCounter, TableMap};

struct ControlPlane {
    exec: Arc<RecordingExecutor>,
    registry: Arc<StaticRegistry>,
    counter: Arc<RuleRefCounter>,
    manager: FwmarkRuleManager<RecordingExecutor>,
}

fn control_plane() -> ControlPlane {
    let exec = Arc::new(RecordingExecutor::new());
    let sequencer = Arc::new(CommandSequencer::new(exec.clone(), ToolsConfig::default()));
    let registry = Arc::new(StaticRegistry::new());
    registry.insert_network("tun0", 5);
    registry.insert_network("tun1", 9);
    let counter = Arc::new(RuleRefCounter::new());
    let manager = FwmarkRuleManager::new(
        sequencer,
        registry.clone(),
        counter.clone(),
        TableMap::new(100),
    );
    ControlPlane {
        exec,
        registry,
        counter,
        manager,
    }
}

// ============================================================================
// Bring-up
// ============================================================================

#[test]
fn test_bring_up_prepares_hooks_before_activation() {
    let plane = control_plane();
    plane.manager.setup_hooks().unwrap();
    plane.manager.add_fwmark_rule("tun0").unwrap();

    let lines = plane.exec.call_lines();

    // Hook preparation comes first: flush both chains, then the two
    // standing bypasses, each once per family.
    assert_eq!(lines[0], "iptables -t mangle -F st_mangle_OUTPUT");
    assert_eq!(lines[2], "iptables -t mangle -F st_mangle_EXEMPT");
    assert!(lines[4].contains("--mark 1 -j RETURN"));
    assert!(lines[6].contains("--uid-owner vpn -j RETURN"));

    // Activation follows, bound to table 105 (net 5, base 100).
    assert!(lines[8..].iter().any(|l| l == "ip rule add prio 100 fwmark 105 table 105"));
    assert!(plane.counter.active(5));
}

#[test]
fn test_two_interfaces_get_disjoint_tables_and_chains() {
    let plane = control_plane();
    plane.manager.add_fwmark_rule("tun0").unwrap();
    plane.manager.add_fwmark_rule("tun1").unwrap();

    let lines = plane.exec.call_lines();
    assert!(lines.contains(&"ip rule add prio 100 fwmark 105 table 105".to_string()));
    assert!(lines.contains(&"ip rule add prio 100 fwmark 109 table 109".to_string()));
    assert!(lines.contains(&"iptables -t mangle -N st_mangle_tun0_OUTPUT".to_string()));
    assert!(lines.contains(&"iptables -t mangle -N st_mangle_tun1_OUTPUT".to_string()));
    assert!(plane.counter.active(5));
    assert!(plane.counter.active(9));
}

// ============================================================================
// Busy guard and reactivation
// ============================================================================

#[test]
fn test_double_activation_is_refused_without_side_effects() {
    let plane = control_plane();
    plane.manager.add_fwmark_rule("tun0").unwrap();
    let calls_after_first = plane.exec.call_count();

    let err = plane.manager.add_fwmark_rule("tun0").unwrap_err();
    assert!(matches!(err, RuleError::Busy { net_id: 5 }));
    assert_eq!(plane.exec.call_count(), calls_after_first);
    assert_eq!(plane.counter.count(5), 1);
}

#[test]
fn test_interface_can_be_reactivated_after_teardown() {
    let plane = control_plane();
    plane.manager.add_fwmark_rule("tun0").unwrap();
    plane.manager.remove_fwmark_rule("tun0").unwrap();
    assert!(!plane.counter.active(5));

    plane.manager.add_fwmark_rule("tun0").unwrap();
    assert!(plane.counter.active(5));
}

#[test]
fn test_reattach_follows_a_network_move() {
    let plane = control_plane();
    plane.manager.add_fwmark_rule("tun0").unwrap();
    plane.manager.remove_fwmark_rule("tun0").unwrap();

    // The registry reassigns tun0 to a different network between
    // detach and attach; the next activation uses the new table.
    plane.registry.insert_network("tun0", 7);
    plane.manager.add_fwmark_rule("tun0").unwrap();

    let lines = plane.exec.call_lines();
    assert!(lines.contains(&"ip rule add prio 100 fwmark 107 table 107".to_string()));
    assert!(plane.counter.active(7));
    assert!(!plane.counter.active(5));
}

// ============================================================================
// Teardown isolation
// ============================================================================

#[test]
fn test_teardown_of_one_interface_leaves_the_other_active() {
    let plane = control_plane();
    plane.manager.add_fwmark_rule("tun0").unwrap();
    plane.manager.add_fwmark_rule("tun1").unwrap();

    plane.manager.remove_fwmark_rule("tun0").unwrap();

    assert!(!plane.counter.active(5));
    assert!(plane.counter.active(9));

    let lines = plane.exec.call_lines();
    assert!(lines.contains(&"iptables -t mangle -X st_mangle_tun0_OUTPUT".to_string()));
    assert!(!lines.iter().any(|l| l.contains("-X st_mangle_tun1_OUTPUT")));
}

// ============================================================================
// IPv6 NAT fallback
// ============================================================================

#[test]
fn test_missing_v6_nat_degrades_to_reject_and_back() {
    let plane = control_plane();
    plane.exec.fail_when("ip6tables -t nat", 1);

    plane.manager.add_fwmark_rule("tun0").unwrap();
    assert!(plane.counter.active(5));
    assert!(plane.exec.call_lines().contains(
        &"ip6tables -t filter -A st_filter_OUTPUT -m mark --mark 105 -j REJECT".to_string()
    ));

    // Teardown on the same kernel removes the fallback rule again.
    plane.manager.remove_fwmark_rule("tun0").unwrap();
    assert!(!plane.counter.active(5));
    assert!(plane.exec.call_lines().contains(
        &"ip6tables -t filter -D st_filter_OUTPUT -m mark --mark 105 -j REJECT".to_string()
    ));
}
