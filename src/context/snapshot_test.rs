use crate::ConfigSnapshot;
use crate::Context;
use crate::SnapshotDiff;

fn snapshot(
    names: &[&str],
    current: Option<&str>,
) -> ConfigSnapshot {
    ConfigSnapshot::new(
        names.iter().map(|n| Context::new(*n, format!("https://{n}"), "admin")).collect(),
        current.map(String::from),
    )
}

/// Case 1: identical snapshots diff to empty
#[test]
fn test_diff_identical_is_empty() {
    let a = snapshot(&["ctx1", "ctx2"], Some("ctx1"));
    let b = a.clone();
    let diff = SnapshotDiff::between(&a, &b);
    assert!(diff.is_empty());
}

/// Case 2: added and removed contexts are detected by name
#[test]
fn test_diff_added_and_removed() {
    let old = snapshot(&["ctx1", "ctx2"], Some("ctx1"));
    let new = snapshot(&["ctx2", "ctx3"], Some("ctx1"));
    let diff = SnapshotDiff::between(&old, &new);
    assert_eq!(diff.added, vec!["ctx3".to_string()]);
    assert_eq!(diff.removed, vec!["ctx1".to_string()]);
    assert!(diff.modified.is_empty());
    assert!(!diff.current_changed);
}

/// Case 3: same name but different credentials counts as modified
#[test]
fn test_diff_modified_credentials() {
    let old = snapshot(&["ctx1"], Some("ctx1"));
    let mut new = old.clone();
    new.contexts[0].user = "other".into();
    let diff = SnapshotDiff::between(&old, &new);
    assert_eq!(diff.modified, vec!["ctx1".to_string()]);
    assert!(diff.invalidates("ctx1"));
}

/// Case 4: moving the current pointer flips current_changed only
#[test]
fn test_diff_current_changed() {
    let old = snapshot(&["ctx1", "ctx2"], Some("ctx1"));
    let new = snapshot(&["ctx1", "ctx2"], Some("ctx2"));
    let diff = SnapshotDiff::between(&old, &new);
    assert!(diff.current_changed);
    assert!(diff.added.is_empty());
    assert!(diff.removed.is_empty());
    assert!(!diff.is_empty());
}

#[test]
fn test_current_context_requires_presence() {
    let snap = snapshot(&["ctx1"], Some("ghost"));
    assert!(snap.current_context().is_none());

    let snap = snapshot(&["ctx1"], Some("ctx1"));
    assert_eq!(snap.current_context().map(|c| c.name.as_str()), Some("ctx1"));
}
