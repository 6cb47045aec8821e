// ==========================
// tests/unit/password_tests.rs
// ==========================
//! Password policy and credential hashing
use crate::test_utils::test_settings;
use identity_backend_lib::auth::CredentialHasher;
use identity_backend_lib::config::HashAlgorithm;
use identity_backend_lib::validation::{PasswordPolicy, ValidationError};

#[test]
fn test_password_strength_validation() {
    let policy = PasswordPolicy::default();

    // Valid password
    assert!(policy.validate("Str0ng!pwd").is_ok());

    // Every password shorter than 8 characters is rejected
    for candidate in ["S!a", "Str0!pw", "Aa!Aa!A"] {
        assert!(policy.validate(candidate).is_err(), "{candidate} accepted");
    }

    // Missing uppercase
    assert!(policy.validate("securep@ssw0rd").is_err());

    // Missing lowercase
    assert!(policy.validate("SECUREP@SSW0RD").is_err());

    // Missing symbol
    assert!(policy.validate("SecurePassw0rd").is_err());

    // Digits are not required
    assert!(policy.validate("Secure@Password").is_ok());
}

#[test]
fn test_policy_violation_is_one_aggregate_message() {
    let policy = PasswordPolicy::default();
    let messages: Vec<String> = ["short", "nouppercase!", "NOLOWERCASE!", "NoSymbolHere"]
        .iter()
        .map(|p| policy.validate(p).unwrap_err().to_string())
        .collect();

    assert!(messages.windows(2).all(|w| w[0] == w[1]));
    assert!(matches!(
        policy.validate("short"),
        Err(ValidationError::PolicyViolation(_))
    ));
}

#[test]
fn test_password_hashing_and_verification() {
    let hasher = CredentialHasher::new(&test_settings().hashing).unwrap();
    let password = "Str0ng!pwd";

    let first = hasher.hash(password).unwrap();
    let second = hasher.hash(password).unwrap();

    // Salted: same input, different stored value, neither is the plaintext
    assert_ne!(first, second);
    assert!(!first.contains(password));

    assert!(hasher.verify(&first, password));
    assert!(hasher.verify(&second, password));
    assert!(!hasher.verify(&first, "Str0ng!pwd "));
    assert!(!hasher.verify(&first, "str0ng!pwd"));
}

#[test]
fn test_scrypt_hashes_stay_verifiable_after_switching_to_argon2() {
    let mut settings = test_settings();
    settings.hashing.algorithm = HashAlgorithm::Scrypt;
    let legacy = CredentialHasher::new(&settings.hashing).unwrap();
    let stored = legacy.hash("Str0ng!pwd").unwrap();

    let current = CredentialHasher::new(&test_settings().hashing).unwrap();
    assert_eq!(current.algorithm(), HashAlgorithm::Argon2id);
    assert!(current.verify(&stored, "Str0ng!pwd"));
    assert!(!current.verify(&stored, "wrong"));
}
