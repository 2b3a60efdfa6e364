//! Mark query tests
//!
//! This module verifies the read-only query surface: callers ask which
//! mark to stamp on their sockets, the answers come straight from
//! registry state plus table arithmetic, and nothing is executed.

use std::sync::Arc;

use netmark_router::config::ToolsConfig;
use netmark_router::exec::{CommandSequencer, RecordingExecutor};
use netmark_router::marks::{MarkQueryService, UidRuleManager};
use netmark_router::registry::StaticRegistry;
use netmark_router::response::{BufferedResponseSink, ResponseCode};
use netmark_router::rules::TableMap;

fn service() -> (Arc<StaticRegistry>, MarkQueryService) {
    let registry = Arc::new(StaticRegistry::new());
    registry.insert_network("tun0", 5);
    let service = MarkQueryService::new(registry.clone(), TableMap::new(100));
    (registry, service)
}

#[test]
fn test_uid_mark_reflects_a_live_binding() {
    let (registry, service) = service();
    let exec = Arc::new(RecordingExecutor::new());
    let sequencer = Arc::new(CommandSequencer::new(exec.clone(), ToolsConfig::default()));
    let uid_rules = UidRuleManager::new(sequencer, registry);

    uid_rules.add_uid_rule("tun0", 10000, 10999).unwrap();

    let sink = BufferedResponseSink::new();
    service.get_uid_mark(&sink, 10500);
    assert_eq!(
        sink.last(),
        Some((ResponseCode::GetMarkResult, "105".to_string()))
    );
}

#[test]
fn test_unbound_uid_reports_the_base_mark() {
    let (_registry, service) = service();
    assert_eq!(service.uid_mark(4242), "100");
}

#[test]
fn test_protect_mark_query() {
    let (_registry, service) = service();
    let sink = BufferedResponseSink::new();
    service.get_protect_mark(&sink);
    assert_eq!(
        sink.last(),
        Some((ResponseCode::GetMarkResult, "1".to_string()))
    );
}

#[test]
fn test_queries_execute_nothing() {
    let (registry, service) = service();
    let exec = Arc::new(RecordingExecutor::new());
    let sequencer = Arc::new(CommandSequencer::new(exec.clone(), ToolsConfig::default()));
    let uid_rules = UidRuleManager::new(sequencer, registry);
    uid_rules.add_uid_rule("tun0", 10000, 10999).unwrap();
    let calls_after_bind = exec.call_count();

    let sink = BufferedResponseSink::new();
    service.get_uid_mark(&sink, 10500);
    service.get_protect_mark(&sink);

    assert_eq!(exec.call_count(), calls_after_bind);
    assert_eq!(sink.responses().len(), 2);
}
