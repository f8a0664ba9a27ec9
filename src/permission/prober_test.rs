use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio::time::timeout;

use crate::engine::EngineEvent;
use crate::test_utils::context;
use crate::test_utils::StaticReviewer;
use crate::PermissionProber;
use crate::PermissionRequest;
use crate::PermissionResult;
use crate::Scope;

fn requests(resources: &[&str]) -> Vec<PermissionRequest> {
    resources.iter().map(|r| PermissionRequest::watch(*r, Scope::Namespaced)).collect()
}

async fn next_result(rx: &mut mpsc::Receiver<EngineEvent>) -> (u64, PermissionResult) {
    let event = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no event within timeout")
        .expect("event channel closed");
    match event {
        EngineEvent::PermissionResult { round, result } => (round, result),
        other => panic!("expected PermissionResult, got {other:?}"),
    }
}

#[tokio::test]
async fn test_grants_and_denials_grouped() {
    let (tx, mut rx) = mpsc::channel(16);
    let reviewer = StaticReviewer::new(&[("pods", true), ("services", true), ("secrets", false)]);
    let prober = Arc::new(PermissionProber::new(
        context("ctx1"),
        7,
        requests(&["pods", "services", "secrets"]),
        reviewer,
        tx,
    ));
    prober.start();

    let (round, permitted) = next_result(&mut rx).await;
    assert_eq!(round, 7);
    assert!(permitted.permitted);
    assert_eq!(permitted.resources, vec!["pods", "services"]);
    assert!(permitted.reason.is_none());

    let (_, denied) = next_result(&mut rx).await;
    assert!(!denied.permitted);
    assert_eq!(denied.resources, vec!["secrets"]);

    assert_eq!(prober.permissions().len(), 3);
    assert!(prober.is_for_context("ctx1"));
    assert!(!prober.is_for_context("ctx2"));
    assert_eq!(prober.round(), 7);
}

/// A reviewer error for one resource denies that resource with a reason and
/// leaves the rest of the batch untouched.
#[tokio::test]
async fn test_review_error_becomes_denial() {
    let (tx, mut rx) = mpsc::channel(16);
    let reviewer = StaticReviewer::with_failing(&[("pods", true)], &["secrets"]);
    let prober = Arc::new(PermissionProber::new(
        context("ctx1"),
        1,
        requests(&["pods", "secrets"]),
        reviewer,
        tx,
    ));
    prober.start();

    let (_, permitted) = next_result(&mut rx).await;
    assert_eq!(permitted.resources, vec!["pods"]);

    let (_, denied) = next_result(&mut rx).await;
    assert_eq!(denied.resources, vec!["secrets"]);
    assert!(denied.reason.as_deref().unwrap_or_default().contains("scripted review failure"));
}

#[tokio::test]
async fn test_all_denied_emits_single_group() {
    let (tx, mut rx) = mpsc::channel(16);
    let reviewer = StaticReviewer::new(&[]);
    let prober = Arc::new(PermissionProber::new(
        context("ctx1"),
        1,
        requests(&["pods", "secrets"]),
        reviewer,
        tx,
    ));
    prober.start();

    let (_, denied) = next_result(&mut rx).await;
    assert!(!denied.permitted);
    assert_eq!(denied.resources, vec!["pods", "secrets"]);

    sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err(), "only one group expected");
}

/// Disposing before the evaluation runs suppresses both the stored verdicts
/// and the emitted events.
#[tokio::test]
async fn test_disposed_prober_emits_nothing() {
    let (tx, mut rx) = mpsc::channel(16);
    let reviewer = StaticReviewer::new(&[("pods", true)]);
    let prober = Arc::new(PermissionProber::new(context("ctx1"), 1, requests(&["pods"]), reviewer, tx));
    prober.start();
    prober.dispose();

    sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
    assert!(prober.permissions().is_empty());
}
