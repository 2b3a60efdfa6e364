//! Secondary-table route editing tests
//!
//! This module covers the route editor's three rule families: routes in
//! an interface's secondary table, source-address rules, and local
//! subnet routes, with the reference counter and response reporting
//! observed from outside.
//!
//! # Background
//!
//! Routes and from rules only count once the external call succeeds.
//! Local routes count before the call: interface teardown commonly
//! races the delete, and the accounting must not drift when the delete
//! loses that race.

use std::sync::Arc;

use netmark_router::chain::FwmarkRuleManager;
use netmark_router::config::ToolsConfig;
use netmark_router::error::RouteError;
use netmark_router::exec::{CommandSequencer, RecordingExecutor};
use netmark_router::registry::StaticRegistry;
use netmark_router::response::{BufferedResponseSink, ResponseCode};
use netmark_router::routes::RouteEditor;
use netmark_router::rules::{RuleRefCounter, TableMap};

struct Plane {
    exec: Arc<RecordingExecutor>,
    counter: Arc<RuleRefCounter>,
    editor: RouteEditor<RecordingExecutor>,
    manager: FwmarkRuleManager<RecordingExecutor>,
}

fn plane() -> Plane {
    let exec = Arc::new(RecordingExecutor::new());
    let sequencer = Arc::new(CommandSequencer::new(exec.clone(), ToolsConfig::default()));
    let registry = Arc::new(StaticRegistry::new());
    registry.insert_network("tun0", 5);
    let counter = Arc::new(RuleRefCounter::new());
    let tables = TableMap::new(100);
    let editor = RouteEditor::new(
        sequencer.clone(),
        registry.clone(),
        counter.clone(),
        tables,
    );
    let manager = FwmarkRuleManager::new(sequencer, registry, counter.clone(), tables);
    Plane {
        exec,
        counter,
        editor,
        manager,
    }
}

// ============================================================================
// Table routes
// ============================================================================

#[test]
fn test_gateway_route_lands_in_secondary_table() {
    let plane = plane();
    let sink = BufferedResponseSink::new();

    plane
        .editor
        .add_route(&sink, "tun0", "192.0.2.0", 24, "10.0.0.1")
        .unwrap();

    assert_eq!(
        plane.exec.call_lines(),
        vec!["ip route add 192.0.2.0/24 via 10.0.0.1 dev tun0 table 105"]
    );
    assert_eq!(
        sink.last(),
        Some((ResponseCode::CommandOkay, "Route modified".to_string()))
    );
    assert_eq!(plane.counter.count(5), 1);
}

#[test]
fn test_unspecified_gateway_installs_device_route() {
    let plane = plane();
    let sink = BufferedResponseSink::new();

    plane
        .editor
        .add_route(&sink, "tun0", "2001:db8::", 32, "::")
        .unwrap();

    assert_eq!(
        plane.exec.call_lines(),
        vec!["ip route add 2001:db8::/32 dev tun0 table 105"]
    );
}

#[test]
fn test_failed_route_reports_and_leaves_count_alone() {
    let plane = plane();
    let sink = BufferedResponseSink::new();
    plane.exec.fail_when("route add", 2);

    let err = plane
        .editor
        .add_route(&sink, "tun0", "192.0.2.0", 24, "10.0.0.1")
        .unwrap_err();

    assert!(matches!(err, RouteError::CommandFailed { status: 2 }));
    assert_eq!(
        sink.last(),
        Some((
            ResponseCode::OperationFailed,
            "ip route modification failed".to_string()
        ))
    );
    assert_eq!(plane.counter.count(5), 0);
}

#[test]
fn test_route_removal_decrements() {
    let plane = plane();
    let sink = BufferedResponseSink::new();

    plane
        .editor
        .add_route(&sink, "tun0", "192.0.2.0", 24, "10.0.0.1")
        .unwrap();
    plane
        .editor
        .remove_route(&sink, "tun0", "192.0.2.0", 24, "10.0.0.1")
        .unwrap();

    assert_eq!(plane.counter.count(5), 0);
    assert!(plane.exec.call_lines()[1].starts_with("ip route del"));
}

#[test]
fn test_malformed_destination_is_rejected_up_front() {
    let plane = plane();
    let sink = BufferedResponseSink::new();

    let err = plane
        .editor
        .add_route(&sink, "tun0", "not-an-address", 24, "10.0.0.1")
        .unwrap_err();

    assert!(matches!(err, RouteError::InvalidDestination { .. }));
    assert_eq!(plane.exec.call_count(), 0);
    assert!(sink.responses().is_empty());
}

#[test]
fn test_routes_and_fwmark_rules_share_the_count() {
    let plane = plane();
    let sink = BufferedResponseSink::new();

    plane.manager.add_fwmark_rule("tun0").unwrap();
    plane
        .editor
        .add_route(&sink, "tun0", "192.0.2.0", 24, "10.0.0.1")
        .unwrap();
    assert_eq!(plane.counter.count(5), 2);

    // Dropping the route leaves the fwmark rule set active.
    plane
        .editor
        .remove_route(&sink, "tun0", "192.0.2.0", 24, "10.0.0.1")
        .unwrap();
    assert_eq!(plane.counter.count(5), 1);
    assert!(plane.counter.active(5));
}

// ============================================================================
// From rules
// ============================================================================

#[test]
fn test_from_rule_selects_family_by_address() {
    let plane = plane();

    plane.editor.add_from_rule(5, "10.1.2.3").unwrap();
    plane.editor.add_from_rule(5, "2001:db8::1").unwrap();

    assert_eq!(
        plane.exec.call_lines(),
        vec![
            "ip -4 rule add from 10.1.2.3 table 105",
            "ip -6 rule add from 2001:db8::1 table 105",
        ]
    );
    assert_eq!(plane.counter.count(5), 2);
}

#[test]
fn test_failed_from_rule_does_not_count() {
    let plane = plane();
    plane.exec.fail_when("rule add from", 1);

    let err = plane.editor.add_from_rule(5, "10.1.2.3").unwrap_err();
    assert!(matches!(err, RouteError::CommandFailed { status: 1 }));
    assert_eq!(plane.counter.count(5), 0);
}

// ============================================================================
// Local routes
// ============================================================================

#[test]
fn test_local_route_counts_even_when_the_delete_fails() {
    let plane = plane();

    plane
        .editor
        .add_local_route(5, "tun0", "192.168.7.0/24")
        .unwrap();
    assert_eq!(plane.counter.count(5), 1);

    // The interface is gone by the time the delete runs. The command
    // fails but the rule still stops being accounted for.
    plane.exec.fail_when("route del", 2);
    let err = plane
        .editor
        .remove_local_route(5, "tun0", "192.168.7.0/24")
        .unwrap_err();
    assert!(matches!(err, RouteError::CommandFailed { status: 2 }));
    assert_eq!(plane.counter.count(5), 0);
}

#[test]
fn test_local_route_command_shape() {
    let plane = plane();

    plane
        .editor
        .add_local_route(5, "tun0", "192.168.7.0/24")
        .unwrap();

    assert_eq!(
        plane.exec.call_lines(),
        vec!["ip route add 192.168.7.0/24 dev tun0 table 105"]
    );
}
