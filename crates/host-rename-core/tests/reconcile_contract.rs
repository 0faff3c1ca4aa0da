//! Contract Test: Event Reconciliation
//!
//! Verifies the create/update/destroy table against a file-backed store:
//! - Create stores the record and never reports a rename
//! - Update reports a rename only for a known id with a different name
//! - Update for an unknown id stores the name without reporting a rename,
//!   and logs a warning
//! - Destroy removes the record and tolerates unknown ids
//! - Unknown actions fail without touching the store

mod common;

use common::*;
use host_rename_core::{
    Error, FileHostStore, HookAction, HostRecord, HostStore, LifecycleEvent, Reconciler,
};
use tempfile::tempdir;

async fn seeded_store(dir: &std::path::Path) -> FileHostStore {
    let store = FileHostStore::create(dir.join("hosts.json")).await.unwrap();
    store.insert_all(&hosts(3)).await.unwrap();
    store
}

#[tokio::test]
async fn create_then_get_returns_record() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path()).await;
    let reconciler = Reconciler::new(&store);

    for (id, name) in [(999_999, "foo.example.com"), (2, "replaced.example.com")] {
        let result = reconciler
            .apply(&LifecycleEvent::new(HookAction::Create, id, name))
            .await
            .unwrap();
        assert!(result.applied);
        assert!(!result.rename_detected);

        assert_eq!(store.get(id).await.unwrap(), Some(HostRecord::new(id, name)));
    }
}

#[tokio::test]
async fn update_without_rename_is_not_flagged() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path()).await;
    let reconciler = Reconciler::new(&store);

    reconciler
        .apply(&LifecycleEvent::new(HookAction::Create, 999_999, "foo.example.com"))
        .await
        .unwrap();
    let result = reconciler
        .apply(&LifecycleEvent::new(HookAction::Update, 999_999, "foo.example.com"))
        .await
        .unwrap();

    assert!(!result.rename_detected, "falsely detected that a rename occurred");
    assert_eq!(result.old_name.as_deref(), Some("foo.example.com"));
}

#[tokio::test]
async fn update_with_new_name_is_a_rename() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path()).await;
    let reconciler = Reconciler::new(&store);

    reconciler
        .apply(&LifecycleEvent::new(HookAction::Create, 999_999, "foo.example.com"))
        .await
        .unwrap();
    let result = reconciler
        .apply(&LifecycleEvent::new(HookAction::Update, 999_999, "bar.example.com"))
        .await
        .unwrap();

    assert!(result.rename_detected, "failed to detect that a rename occurred");
    assert_eq!(result.old_name.as_deref(), Some("foo.example.com"));
    assert_eq!(result.new_name, "bar.example.com");
    assert_eq!(
        store.get(999_999).await.unwrap(),
        Some(HostRecord::new(999_999, "bar.example.com"))
    );

    // The rename survives a reopen
    let reopened = FileHostStore::open(dir.path().join("hosts.json")).await.unwrap();
    assert_eq!(
        reopened.get(999_999).await.unwrap(),
        Some(HostRecord::new(999_999, "bar.example.com"))
    );
}

#[tokio::test]
async fn update_for_unknown_id_records_baseline() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path()).await;
    let reconciler = Reconciler::new(&store);

    let logs = LogCapture::default();
    let result = {
        let _guard = logs.install();
        reconciler
            .apply(&LifecycleEvent::new(HookAction::Update, 4242, "drift.example.com"))
            .await
            .unwrap()
    };

    let output = logs.contents();
    assert!(output.contains("WARN"), "missing warning in: {}", output);
    assert!(output.contains("4242"));
    assert!(output.contains("not in the store"));

    assert!(!result.rename_detected);
    assert_eq!(result.old_name, None);
    assert_eq!(
        store.get(4242).await.unwrap(),
        Some(HostRecord::new(4242, "drift.example.com"))
    );

    // The next update has a baseline to compare against
    let result = reconciler
        .apply(&LifecycleEvent::new(HookAction::Update, 4242, "fixed.example.com"))
        .await
        .unwrap();
    assert_eq!(result.rename(), Some(("drift.example.com", "fixed.example.com")));
}

#[tokio::test]
async fn destroy_removes_record_and_tolerates_unknown_ids() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path()).await;
    let reconciler = Reconciler::new(&store);

    for id in [1, 2, 3] {
        let result = reconciler
            .apply(&LifecycleEvent::new(HookAction::Destroy, id, format!("host{}.example.com", id)))
            .await
            .unwrap();
        assert!(!result.rename_detected);
        assert_eq!(store.get(id).await.unwrap(), None);
    }

    let result = reconciler
        .apply(&LifecycleEvent::new(HookAction::Destroy, 31337, "ghost.example.com"))
        .await
        .unwrap();
    assert!(result.applied);
    assert_eq!(store.len().await.unwrap(), 0);
}

#[tokio::test]
async fn unsupported_action_leaves_store_unchanged() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path()).await;
    let before = store.list().await.unwrap();
    let on_disk_before = std::fs::read(dir.path().join("hosts.json")).unwrap();

    let err = Reconciler::new(&store)
        .apply_raw("frobnicate", HostRecord::new(1, "renamed.example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnsupportedAction(ref action) if action == "frobnicate"));
    assert_eq!(store.list().await.unwrap(), before);
    assert_eq!(std::fs::read(dir.path().join("hosts.json")).unwrap(), on_disk_before);
}
