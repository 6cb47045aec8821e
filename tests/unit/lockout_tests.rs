// ==========================
// tests/unit/lockout_tests.rs
// ==========================
//! Lockout state machine against the in-memory store
use identity_backend_lib::auth::{LockState, LockoutPolicy, LockoutTracker, Reservation};
use identity_backend_lib::identity::{ClaimId, Identity, NewIdentity};
use identity_backend_lib::storage::{IdentityStore, InMemoryStore};
use std::sync::Arc;

async fn seeded_identity(store: &InMemoryStore) -> Identity {
    store.seed_claim(ClaimId::USER, "User").await.unwrap();
    store
        .create_identity(
            NewIdentity {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "$argon2id$placeholder".to_string(),
            },
            ClaimId::USER,
        )
        .await
        .unwrap()
}

/// A wrong password end to end: take a slot, then settle it as a failure
async fn fail_once(
    tracker: &LockoutTracker,
    store: &InMemoryStore,
    identity: &Identity,
) -> Option<LockState> {
    match tracker.reserve(store, identity).await.unwrap() {
        Reservation::Granted(reserved) => Some(tracker.record_failure(identity, reserved)),
        Reservation::Locked => None,
    }
}

#[tokio::test]
async fn test_threshold_is_configurable() {
    let store = InMemoryStore::new();
    let identity = seeded_identity(&store).await;
    let tracker = LockoutTracker::new(LockoutPolicy { threshold: 6 });

    for _ in 0..5 {
        assert_eq!(
            fail_once(&tracker, &store, &identity).await,
            Some(LockState::Open)
        );
    }
    assert_eq!(
        fail_once(&tracker, &store, &identity).await,
        Some(LockState::Locked)
    );
    assert_eq!(fail_once(&tracker, &store, &identity).await, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reservations_stop_at_threshold() {
    let store = Arc::new(InMemoryStore::new());
    let identity = seeded_identity(&store).await;
    let tracker = LockoutTracker::new(LockoutPolicy::default());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        let identity = identity.clone();
        let tracker = tracker.clone();
        handles.push(tokio::spawn(async move {
            tracker.reserve(&*store, &identity).await.unwrap()
        }));
    }

    let mut granted = Vec::new();
    for handle in handles {
        if let Reservation::Granted(reserved) = handle.await.unwrap() {
            granted.push(reserved);
        }
    }

    // Every slot was taken from a distinct base and none past the threshold
    granted.sort_unstable();
    assert_eq!(granted, vec![1, 2, 3, 4]);
    let reloaded = store.find_by_id(identity.id).await.unwrap().unwrap();
    assert_eq!(reloaded.failed_login_attempts, 4);
    assert_eq!(tracker.state(&reloaded), LockState::Locked);
}

#[tokio::test]
async fn test_single_failure_after_reset_does_not_lock() {
    let store = InMemoryStore::new();
    let identity = seeded_identity(&store).await;
    let tracker = LockoutTracker::new(LockoutPolicy::default());

    for _ in 0..3 {
        fail_once(&tracker, &store, &identity).await;
    }
    let reloaded = store.find_by_id(identity.id).await.unwrap().unwrap();
    let reservation = tracker.reserve(&store, &reloaded).await.unwrap();
    let Reservation::Granted(reserved) = reservation else {
        panic!("three failures must not lock");
    };
    tracker
        .record_success(&store, &reloaded, reserved)
        .await
        .unwrap();

    let reloaded = store.find_by_id(identity.id).await.unwrap().unwrap();
    assert_eq!(reloaded.failed_login_attempts, 0);
    assert_eq!(
        fail_once(&tracker, &store, &reloaded).await,
        Some(LockState::Open)
    );
}
