//! Reboot recovery tests
//!
//! After a device restart the OS has forgotten every region; replay must
//! re-register all durable fences, tolerate individual failures, and be
//! idempotent when triggered more than once.

use super::test_utils::{definition, FakeBackend};
use fenceline::recovery::RebootRecovery;
use fenceline::registry::FenceRegistry;
use fenceline::store::SledDurableStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;

async fn populated_registry(
    backend: Arc<FakeBackend>,
    ids: &[&str],
) -> (Arc<FenceRegistry>, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SledDurableStore::new(dir.path()).unwrap());
    let registry = Arc::new(FenceRegistry::new(store, backend));
    for id in ids {
        registry.register(&definition(id), true).await.unwrap();
    }
    (registry, dir)
}

#[tokio::test]
async fn test_replay_restores_all_registrations() {
    let backend = FakeBackend::new();
    let (registry, _dir) = populated_registry(Arc::clone(&backend), &["home", "work", "gym"]).await;

    // Simulate reboot: OS loses its regions, the snapshot survives.
    backend.active.lock().clear();

    let count = registry.replay_all().await.unwrap();
    assert_eq!(count, 3);

    let expected: BTreeSet<String> = ["home", "work", "gym"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(backend.active_ids(), expected);
}

#[tokio::test]
async fn test_replay_is_idempotent() {
    let backend = FakeBackend::new();
    let (registry, _dir) = populated_registry(Arc::clone(&backend), &["home", "work"]).await;
    backend.active.lock().clear();

    let first = registry.replay_all().await.unwrap();
    let second = registry.replay_all().await.unwrap();

    assert_eq!(first, 2);
    assert_eq!(second, 2);
    assert_eq!(backend.active_ids().len(), 2);
    // Replay never re-persists, so the snapshot is unchanged.
    assert_eq!(registry.persisted_fences().unwrap().len(), 2);
}

#[tokio::test]
async fn test_one_failed_entry_does_not_abort_the_rest() {
    let backend = FakeBackend::new();
    let (registry, _dir) = populated_registry(Arc::clone(&backend), &["home", "work", "gym"]).await;
    backend.active.lock().clear();
    backend.fail_ids.lock().insert("work".to_string());

    let count = registry.replay_all().await.unwrap();

    assert_eq!(count, 2);
    assert!(backend.active_ids().contains("home"));
    assert!(backend.active_ids().contains("gym"));
    assert!(!backend.active_ids().contains("work"));
}

#[tokio::test]
async fn test_replay_uses_empty_initial_triggers() {
    let backend = FakeBackend::new();
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SledDurableStore::new(dir.path()).unwrap());
    let registry = Arc::new(FenceRegistry::new(store, Arc::clone(&backend) as _));

    let mut def = definition("home");
    def.initial_triggers = fenceline::types::TransitionMask::ENTER;
    registry.register(&def, true).await.unwrap();
    backend.active.lock().clear();

    registry.replay_all().await.unwrap();

    // No synthetic transitions on boot: replay registers with an empty
    // initial trigger mask regardless of what the definition carries.
    let triggers = backend.add_triggers.lock();
    assert_eq!(triggers.len(), 2);
    assert!(!triggers[0].is_empty());
    assert!(triggers[1].is_empty());
}

#[tokio::test]
async fn test_boot_completed_trigger() {
    let backend = FakeBackend::new();
    let (registry, _dir) = populated_registry(Arc::clone(&backend), &["home"]).await;
    backend.active.lock().clear();

    let recovery = RebootRecovery::new(Arc::clone(&registry));
    recovery.on_boot_completed().await;

    assert!(backend.active_ids().contains("home"));
}

#[tokio::test]
async fn test_replay_with_empty_snapshot() {
    let backend = FakeBackend::new();
    let (registry, _dir) = populated_registry(Arc::clone(&backend), &[]).await;

    let count = registry.replay_all().await.unwrap();
    assert_eq!(count, 0);
}
