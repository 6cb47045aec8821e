// ==================================
// tests/integration/auth_flow_tests.rs
// ==================================
//! End-to-end flows through the authentication engine
use crate::test_utils::{register_request, setup_engine, setup_file_state};
use chrono::Duration;
use identity_backend_lib::auth::AuthService;
use identity_backend_lib::error::AppError;
use identity_backend_lib::storage::IdentityStore;
use identity_common::RegisterRequest;
use std::sync::Arc;

#[tokio::test]
async fn test_alice_and_bob_receive_their_default_claims() {
    let (engine, _clock) = setup_engine().await;

    let alice = engine
        .register(register_request("alice", "Str0ng!pwd"), false)
        .await
        .unwrap();
    assert_eq!(alice.claims, vec!["User"]);

    let issued = engine.login("alice", "Str0ng!pwd").await.unwrap();
    let claims = engine.authorize(&issued.token).unwrap();
    assert_eq!(claims.claims, vec!["User"]);
    assert!(claims.has_claim("User"));
    assert!(!claims.has_claim("Administrator"));

    let bob = engine
        .register(register_request("bob", "B0b!secret"), true)
        .await
        .unwrap();
    assert_eq!(bob.claims, vec!["Administrator"]);

    let issued = engine.login("bob", "B0b!secret").await.unwrap();
    let claims = engine.authorize(&issued.token).unwrap();
    assert_eq!(claims.claims, vec!["Administrator"]);
    assert!(claims.require("Administrator").is_ok());
}

#[tokio::test]
async fn test_unknown_user_and_wrong_password_are_indistinguishable() {
    let (engine, _clock) = setup_engine().await;
    engine
        .register(register_request("realuser", "Str0ng!pwd"), false)
        .await
        .unwrap();

    let unknown = engine.login("nonexistent", "x").await.unwrap_err();
    let wrong = engine.login("realuser", "wrongpw").await.unwrap_err();

    assert_eq!(unknown.to_string(), wrong.to_string());
    assert_eq!(unknown.sanitized_message(), wrong.sanitized_message());
    assert_eq!(unknown.error_code(), wrong.error_code());
    assert_eq!(unknown.status_code(), wrong.status_code());
}

#[tokio::test]
async fn test_fifth_attempt_after_four_failures_is_locked() {
    let (engine, _clock) = setup_engine().await;
    engine
        .register(register_request("alice", "Str0ng!pwd"), false)
        .await
        .unwrap();

    for attempt in 1..=4 {
        let err = engine.login("alice", "wrong-password").await.unwrap_err();
        assert!(
            matches!(err, AppError::InvalidCredentials),
            "attempt {attempt} returned {err:?}"
        );
    }

    let err = engine.login("alice", "Str0ng!pwd").await.unwrap_err();
    assert!(matches!(err, AppError::AccountLocked));

    // The locked attempt neither reset nor advanced the counter
    let identity = engine
        .store()
        .find_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(identity.failed_login_attempts, 4);

    // Further wrong guesses are rejected as locked too
    assert!(matches!(
        engine.login("alice", "wrong-password").await,
        Err(AppError::AccountLocked)
    ));
}

#[tokio::test]
async fn test_success_resets_the_counter() {
    let (engine, _clock) = setup_engine().await;
    engine
        .register(register_request("alice", "Str0ng!pwd"), false)
        .await
        .unwrap();

    for _ in 0..3 {
        assert!(engine.login("alice", "wrong").await.is_err());
    }
    engine.login("alice", "Str0ng!pwd").await.unwrap();
    let identity = engine
        .store()
        .find_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(identity.failed_login_attempts, 0);

    // One new failure after the reset does not lock
    assert!(matches!(
        engine.login("alice", "wrong").await,
        Err(AppError::InvalidCredentials)
    ));
    assert!(engine.login("alice", "Str0ng!pwd").await.is_ok());
}

#[tokio::test]
async fn test_administrative_unlock() {
    let (engine, _clock) = setup_engine().await;
    engine
        .register(register_request("alice", "Str0ng!pwd"), false)
        .await
        .unwrap();
    for _ in 0..4 {
        let _ = engine.login("alice", "wrong").await;
    }
    assert!(matches!(
        engine.login("alice", "Str0ng!pwd").await,
        Err(AppError::AccountLocked)
    ));

    engine.unlock("alice").await.unwrap();
    assert!(engine.login("alice", "Str0ng!pwd").await.is_ok());
}

#[tokio::test]
async fn test_token_expiry_window() {
    let (engine, clock) = setup_engine().await;
    engine
        .register(register_request("alice", "Str0ng!pwd"), false)
        .await
        .unwrap();
    let issued = engine.login("alice", "Str0ng!pwd").await.unwrap();

    clock.advance(Duration::minutes(59));
    assert!(engine.authorize(&issued.token).is_ok());

    clock.advance(Duration::minutes(2));
    assert!(matches!(
        engine.authorize(&issued.token),
        Err(AppError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_every_token_failure_is_unauthorized() {
    let (engine, _clock) = setup_engine().await;
    for token in ["", "abc", "a.b.c", "eyJhbGciOiJub25lIn0.e30."] {
        assert!(matches!(
            engine.authorize(token),
            Err(AppError::Unauthorized)
        ));
    }
}

#[tokio::test]
async fn test_registration_rejections() {
    let (engine, _clock) = setup_engine().await;
    engine
        .register(register_request("alice", "Str0ng!pwd"), false)
        .await
        .unwrap();

    // Duplicate username
    assert!(matches!(
        engine
            .register(register_request("alice", "Str0ng!pwd"), false)
            .await,
        Err(AppError::AlreadyExists)
    ));

    // Duplicate email
    let request = RegisterRequest {
        username: "alice2".to_string(),
        email: "alice@example.com".to_string(),
        password: "Str0ng!pwd".to_string(),
    };
    assert!(matches!(
        engine.register(request, false).await,
        Err(AppError::AlreadyExists)
    ));

    // Bad email
    let request = RegisterRequest {
        username: "carol".to_string(),
        email: "not-an-email".to_string(),
        password: "Str0ng!pwd".to_string(),
    };
    assert!(matches!(
        engine.register(request, false).await,
        Err(AppError::Validation(_))
    ));

    // Weak password
    assert!(matches!(
        engine.register(register_request("dave", "password"), false).await,
        Err(AppError::Validation(_))
    ));
    assert!(engine.store().find_by_username("dave").await.unwrap().is_none());
}

#[tokio::test]
async fn test_deleted_identity_cannot_log_in() {
    let (engine, _clock) = setup_engine().await;
    engine
        .register(register_request("alice", "Str0ng!pwd"), false)
        .await
        .unwrap();
    engine.delete("alice").await.unwrap();

    assert!(matches!(
        engine.login("alice", "Str0ng!pwd").await,
        Err(AppError::InvalidCredentials)
    ));
    assert!(matches!(
        engine.profile("alice").await,
        Err(AppError::NotFound)
    ));
    // The username stays reserved
    assert!(matches!(
        engine
            .register(register_request("alice", "Str0ng!pwd"), false)
            .await,
        Err(AppError::AlreadyExists)
    ));
}

#[tokio::test]
async fn test_claim_administration() {
    let (engine, _clock) = setup_engine().await;
    engine
        .register(register_request("alice", "Str0ng!pwd"), false)
        .await
        .unwrap();

    engine.define_claim("Auditor").await.unwrap();
    let names: Vec<String> = engine
        .list_claims()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Administrator", "User", "Auditor"]);

    let profile = engine.grant_claim("alice", "Auditor").await.unwrap();
    assert_eq!(profile.claims, vec!["User", "Auditor"]);

    let profile = engine.revoke_claim("alice", "User").await.unwrap();
    assert_eq!(profile.claims, vec!["Auditor"]);

    // Never zero claims
    assert!(matches!(
        engine.revoke_claim("alice", "Auditor").await,
        Err(AppError::Validation(_))
    ));

    let issued = engine.login("alice", "Str0ng!pwd").await.unwrap();
    assert_eq!(engine.authorize(&issued.token).unwrap().claims, vec!["Auditor"]);
}

#[tokio::test]
async fn test_update_email() {
    let (engine, _clock) = setup_engine().await;
    engine
        .register(register_request("alice", "Str0ng!pwd"), false)
        .await
        .unwrap();
    engine
        .register(register_request("bob", "Str0ng!pwd"), false)
        .await
        .unwrap();

    let profile = engine
        .update_email("alice", "alice@new.example.com")
        .await
        .unwrap();
    assert_eq!(profile.email, "alice@new.example.com");
    assert_eq!(profile.username, "alice");

    assert!(matches!(
        engine.update_email("alice", "bob@example.com").await,
        Err(AppError::AlreadyExists)
    ));
    assert!(matches!(
        engine.update_email("alice", "broken").await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_wrong_passwords_lock_once() {
    let (engine, _clock) = setup_engine().await;
    engine
        .register(register_request("alice", "Str0ng!pwd"), false)
        .await
        .unwrap();
    let engine = Arc::new(engine);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine.login("alice", "wrong").await.unwrap_err()
        }));
    }

    let mut checked = 0;
    for handle in handles {
        match handle.await.unwrap() {
            AppError::InvalidCredentials => checked += 1,
            AppError::AccountLocked => {},
            other => panic!("unexpected login error {other:?}"),
        }
    }
    // Only as many guesses as the threshold allows reach the hasher
    assert_eq!(checked, 4);

    let identity = engine
        .store()
        .find_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(identity.failed_login_attempts, 4);
    assert!(matches!(
        engine.login("alice", "Str0ng!pwd").await,
        Err(AppError::AccountLocked)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_burst_with_correct_password_never_exceeds_threshold() {
    let (engine, _clock) = setup_engine().await;
    engine
        .register(register_request("alice", "Str0ng!pwd"), false)
        .await
        .unwrap();
    let engine = Arc::new(engine);

    let mut handles = Vec::new();
    for i in 0..16 {
        let engine = Arc::clone(&engine);
        let password = if i == 15 { "Str0ng!pwd" } else { "wrong" };
        handles.push(tokio::spawn(async move {
            engine.login("alice", password).await
        }));
    }

    let mut wrong_checked = 0;
    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(AppError::InvalidCredentials) => wrong_checked += 1,
            Err(AppError::AccountLocked) => {},
            Err(other) => panic!("unexpected login error {other:?}"),
        }
    }

    assert!(succeeded <= 1);
    // A success clears the counter, which frees at most one more round of slots
    let allowed = if succeeded == 1 { 2 * 4 } else { 4 };
    assert!(
        wrong_checked <= allowed,
        "{wrong_checked} wrong guesses were checked"
    );
    if succeeded == 0 {
        assert_eq!(wrong_checked, 4);
    }
}

#[tokio::test]
async fn test_flat_file_state_survives_reopen() {
    let (state, temp_dir) = setup_file_state().await;
    state
        .auth
        .register(register_request("alice", "Str0ng!pwd"), false)
        .await
        .unwrap();
    let _ = state.auth.login("alice", "wrong").await;
    drop(state);

    let store = identity_backend_lib::storage::FlatFileStore::open(temp_dir.path())
        .await
        .unwrap();
    let alice = store.find_by_username("alice").await.unwrap().unwrap();
    assert_eq!(alice.failed_login_attempts, 1);
    assert_eq!(store.resolve_claim_names(alice.id).await.unwrap(), vec!["User"]);
}

#[tokio::test]
async fn test_failed_snapshot_write_does_not_register() {
    let (state, temp_dir) = setup_file_state().await;
    std::fs::remove_dir_all(temp_dir.path()).unwrap();

    assert!(matches!(
        state
            .auth
            .register(register_request("alice", "Str0ng!pwd"), false)
            .await,
        Err(AppError::Store(_))
    ));
    assert!(matches!(
        state.auth.login("alice", "Str0ng!pwd").await,
        Err(AppError::InvalidCredentials)
    ));

    std::fs::create_dir_all(temp_dir.path()).unwrap();
    state
        .auth
        .register(register_request("alice", "Str0ng!pwd"), false)
        .await
        .unwrap();
    assert!(state.auth.login("alice", "Str0ng!pwd").await.is_ok());
}
