// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
use crate::config::{HashAlgorithm, HashingSettings};
use argon2::{Algorithm, Argon2, Params as Argon2Params, Version};
use scrypt::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Params as ScryptParams, Scrypt,
};
use thiserror::Error;

/// Hashing failures. A wrong password is never one of these.
#[derive(Error, Debug)]
pub enum HashError {
    #[error("invalid hashing parameters: {0}")]
    InvalidParams(String),

    #[error("hashing failed: {0}")]
    Hash(String),
}

/// Produces and verifies salted, adaptive-cost password hashes.
///
/// Hashes are PHC strings, so verification works for hashes produced by
/// either supported algorithm regardless of which one is configured for
/// new hashes.
#[derive(Clone)]
pub struct CredentialHasher {
    algorithm: HashAlgorithm,
    argon2: Argon2<'static>,
    scrypt_params: ScryptParams,
    dummy_hash: String,
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl CredentialHasher {
    /// Build a hasher from settings.
    ///
    /// Computes one hash up front that [`verify_dummy`](Self::verify_dummy)
    /// compares against.
    pub fn new(settings: &HashingSettings) -> Result<Self, HashError> {
        let argon2_params = Argon2Params::new(
            settings.argon2_memory_kib,
            settings.argon2_iterations,
            settings.argon2_parallelism,
            None,
        )
        .map_err(|e| HashError::InvalidParams(e.to_string()))?;
        let scrypt_params = ScryptParams::new(
            settings.scrypt_log_n,
            ScryptParams::RECOMMENDED_R,
            ScryptParams::RECOMMENDED_P,
            ScryptParams::RECOMMENDED_LEN,
        )
        .map_err(|e| HashError::InvalidParams(e.to_string()))?;

        let mut hasher = Self {
            algorithm: settings.algorithm,
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params),
            scrypt_params,
            dummy_hash: String::new(),
        };
        let dummy_salt = SaltString::generate(&mut OsRng);
        hasher.dummy_hash = hasher.hash(dummy_salt.as_str())?;
        Ok(hasher)
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, plain: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = match self.algorithm {
            HashAlgorithm::Argon2id => self.argon2.hash_password(plain.as_bytes(), &salt),
            HashAlgorithm::Scrypt => Scrypt.hash_password_customized(
                plain.as_bytes(),
                None,
                None,
                self.scrypt_params,
                &salt,
            ),
        }
        .map_err(|e| HashError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify a password against a hash.
    ///
    /// Unparseable hashes and wrong passwords both yield `false`; the digest
    /// comparison itself is constant-time.
    pub fn verify(&self, hash: &str, plain: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        let verifiers: [&dyn PasswordVerifier; 2] = [&self.argon2, &Scrypt];
        parsed_hash
            .verify_password(&verifiers, plain.as_bytes())
            .is_ok()
    }

    /// Spend the same work as a real verification and always fail.
    ///
    /// Used when the username does not exist.
    pub fn verify_dummy(&self, plain: &str) -> bool {
        let _ = self.verify(&self.dummy_hash, plain);
        false
    }
}
