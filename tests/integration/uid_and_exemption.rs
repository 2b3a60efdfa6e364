//! Uid binding and host exemption tests
//!
//! This module exercises the two marking paths that do not key on
//! destination prefixes: redirecting a uid range's traffic through an
//! interface chain, and exempting single hosts from marking entirely.
//!
//! # Background
//!
//! A uid rule is half registry state, half firewall rule, and the
//! registry is the gate: the firewall must never say one thing while
//! uid enforcement says another. Exemptions are simpler but touch both
//! a mangle chain and the policy rule list, and are installed
//! best-effort with the statuses combined.

use std::sync::Arc;

use netmark_router::chain::FwmarkRuleManager;
use netmark_router::config::ToolsConfig;
use netmark_router::error::RuleError;
use netmark_router::exec::{CommandSequencer, RecordingExecutor};
use netmark_router::marks::{HostExemptionManager, UidRuleManager};
use netmark_router::registry::{NetworkRegistry, StaticRegistry, NETID_UNSET, PID_UNSPECIFIED};
use netmark_router::rules::{RuleRefCounter, TableMap};

struct Plane {
    exec: Arc<RecordingExecutor>,
    registry: Arc<StaticRegistry>,
    uid_rules: UidRuleManager<RecordingExecutor>,
    exemptions: HostExemptionManager<RecordingExecutor>,
    manager: FwmarkRuleManager<RecordingExecutor>,
}

fn plane() -> Plane {
    let exec = Arc::new(RecordingExecutor::new());
    let sequencer = Arc::new(CommandSequencer::new(exec.clone(), ToolsConfig::default()));
    let registry = Arc::new(StaticRegistry::new());
    registry.insert_network("tun0", 5);
    let counter = Arc::new(RuleRefCounter::new());
    let uid_rules = UidRuleManager::new(sequencer.clone(), registry.clone());
    let exemptions = HostExemptionManager::new(sequencer.clone());
    let manager = FwmarkRuleManager::new(sequencer, registry.clone(), counter, TableMap::new(100));
    Plane {
        exec,
        registry,
        uid_rules,
        exemptions,
        manager,
    }
}

// ============================================================================
// Uid rules
// ============================================================================

#[test]
fn test_uid_rule_redirects_into_the_attached_chain() {
    let plane = plane();
    plane.manager.add_fwmark_rule("tun0").unwrap();
    plane.uid_rules.add_uid_rule("tun0", 10000, 10999).unwrap();

    // The redirect targets the same chain the activation created.
    let lines = plane.exec.call_lines();
    assert!(lines.contains(&"iptables -t mangle -N st_mangle_tun0_OUTPUT".to_string()));
    assert!(lines.contains(
        &"iptables -t mangle -A st_mangle_OUTPUT -m owner --uid-owner 10000-10999 -g st_mangle_tun0_OUTPUT"
            .to_string()
    ));

    // And the registry now routes those uids to network 5.
    assert_eq!(
        plane
            .registry
            .network_of_uid(10500, NETID_UNSET, PID_UNSPECIFIED, false),
        5
    );
}

#[test]
fn test_uid_rule_round_trip_clears_the_binding() {
    let plane = plane();
    plane.uid_rules.add_uid_rule("tun0", 10000, 10999).unwrap();
    plane
        .uid_rules
        .remove_uid_rule("tun0", 10000, 10999)
        .unwrap();

    assert_eq!(plane.registry.bound_range_count(), 0);
    let lines = plane.exec.call_lines();
    assert!(lines[2].contains("-D st_mangle_OUTPUT -m owner --uid-owner 10000-10999"));
}

#[test]
fn test_registry_refusal_keeps_firewall_untouched() {
    let plane = plane();
    plane.registry.refuse_uid_bindings(true);

    let err = plane
        .uid_rules
        .add_uid_rule("tun0", 10000, 10999)
        .unwrap_err();
    assert!(matches!(
        err,
        RuleError::UidBinding {
            uid_start: 10000,
            uid_end: 10999
        }
    ));
    assert_eq!(plane.exec.call_count(), 0);
}

// ============================================================================
// Host exemptions
// ============================================================================

#[test]
fn test_exemption_protects_and_reroutes_the_host() {
    let plane = plane();
    plane.exemptions.add_host_exemption("198.51.100.9").unwrap();

    assert_eq!(
        plane.exec.call_lines(),
        vec![
            "iptables -t mangle -A st_mangle_EXEMPT -d 198.51.100.9 -j MARK --set-mark 1",
            "ip -4 rule add prio 99 to 198.51.100.9 table main",
        ]
    );
}

#[test]
fn test_v6_exemption_stays_on_v6_tools() {
    let plane = plane();
    plane.exemptions.add_host_exemption("2001:db8::9").unwrap();

    let lines = plane.exec.call_lines();
    assert!(lines[0].starts_with("ip6tables "));
    assert!(lines[1].starts_with("ip -6 "));
}

#[test]
fn test_exemption_outlives_interface_teardown() {
    let plane = plane();
    plane.manager.add_fwmark_rule("tun0").unwrap();
    plane.exemptions.add_host_exemption("198.51.100.9").unwrap();

    plane.manager.remove_fwmark_rule("tun0").unwrap();

    // Teardown never touches the exempt chain's member rules.
    let lines = plane.exec.call_lines();
    assert!(!lines.iter().any(|l| l.contains("-D st_mangle_EXEMPT -d")));

    plane
        .exemptions
        .remove_host_exemption("198.51.100.9")
        .unwrap();
    assert!(plane
        .exec
        .call_lines()
        .iter()
        .any(|l| l.contains("-D st_mangle_EXEMPT -d 198.51.100.9")));
}
