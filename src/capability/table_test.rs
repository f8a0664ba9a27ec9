use std::sync::Arc;

use crate::test_utils::watchable_kind;
use crate::test_utils::ScriptedWatchSource;
use crate::CapabilityTable;
use crate::KindCapabilities;
use crate::PermissionRequest;
use crate::Scope;

#[test]
fn test_lookup_and_watchable_kinds() {
    let (source, _tx) = ScriptedWatchSource::new(Vec::new());
    let table = CapabilityTable::new(vec![
        watchable_kind("pods", source),
        KindCapabilities::new("nodes", vec![PermissionRequest::watch("nodes", Scope::Cluster)]),
    ]);

    assert!(table.get("pods").is_some());
    assert!(table.get("nodes").is_some());
    assert!(table.get("deployments").is_none());
    assert_eq!(table.kinds().count(), 2);

    let watchable = table.watchable_kinds();
    assert_eq!(watchable.len(), 1);
    assert_eq!(watchable[0].kind, "pods");
}

#[test]
fn test_requests_grouped_by_scope() {
    let table = CapabilityTable::new(vec![
        KindCapabilities::new("pods", vec![PermissionRequest::watch("pods", Scope::Namespaced)]),
        KindCapabilities::new("services", vec![PermissionRequest::watch("services", Scope::Namespaced)]),
        KindCapabilities::new("nodes", vec![PermissionRequest::watch("nodes", Scope::Cluster)]),
    ]);

    let groups = table.requests_by_scope();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[&Scope::Namespaced].len(), 2);
    assert_eq!(groups[&Scope::Cluster].len(), 1);
    assert_eq!(groups[&Scope::Cluster][0].resource, "nodes");
}

/// Two kinds needing the same underlying permission produce one request.
#[test]
fn test_shared_requests_are_deduplicated() {
    let shared = PermissionRequest::watch("pods", Scope::Namespaced);
    let table = CapabilityTable::new(vec![
        KindCapabilities::new("pods", vec![shared.clone()]),
        KindCapabilities::new("pod-metrics", vec![shared]),
    ]);

    let groups = table.requests_by_scope();
    assert_eq!(groups[&Scope::Namespaced].len(), 1);
}

#[test]
fn test_missing_operations_are_none() {
    let entry = KindCapabilities::new("pods", Vec::new());
    assert!(entry.watch.is_none());
    assert!(entry.delete.is_none());
    assert!(entry.restart.is_none());
    assert!(entry.read.is_none());
    assert!(entry.search.is_none());
    assert!(entry.is_active.is_none());
}

#[test]
fn test_is_active_predicate_applies() {
    let entry = KindCapabilities::new("pods", Vec::new())
        .with_is_active(Arc::new(|object| object.payload["running"] == serde_json::json!(true)));

    let predicate = entry.is_active.as_ref().unwrap();
    let running = crate::ApiObject::new("a", None).with_payload(serde_json::json!({"running": true}));
    let stopped = crate::ApiObject::new("b", None).with_payload(serde_json::json!({"running": false}));
    assert!(predicate(&running));
    assert!(!predicate(&stopped));
}
