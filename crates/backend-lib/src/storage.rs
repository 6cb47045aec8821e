// ============================
// crates/backend-lib/src/storage.rs
// ============================
//! Persistence boundary for identities, claims and their associations.
//!
//! Every mutation is a single atomic operation against the store. Counter
//! updates are compare-and-set on the previously observed value, so two
//! concurrent failed logins can never both be counted from the same base.

mod flat_file;
mod memory;

pub use flat_file::FlatFileStore;
pub use memory::{InMemoryStore, Snapshot};

use crate::identity::{Claim, ClaimId, Identity, IdentityId, NewIdentity};
use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by a store implementation
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("duplicate value for unique field: {0}")]
    Duplicate(String),

    #[error("row was modified concurrently")]
    Conflict,

    #[error("an identity must keep at least one claim")]
    LastClaim,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Trait for identity store backends
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Insert a reference claim with a fixed id unless one already exists
    async fn seed_claim(&self, id: ClaimId, name: &str) -> Result<Claim, StoreError>;

    /// All claim reference rows, ordered by id
    async fn list_claims(&self) -> Result<Vec<Claim>, StoreError>;

    async fn find_claim_by_name(&self, name: &str) -> Result<Option<Claim>, StoreError>;

    /// Define a new claim; the id is allocated by the store
    async fn create_claim(&self, name: &str) -> Result<Claim, StoreError>;

    /// Insert an identity together with its first claim association.
    ///
    /// Either both rows are written or neither is.
    async fn create_identity(
        &self,
        new: NewIdentity,
        initial_claim: ClaimId,
    ) -> Result<Identity, StoreError>;

    /// Case-sensitive lookup; logically deleted identities are not returned
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_by_id(&self, id: IdentityId) -> Result<Option<Identity>, StoreError>;

    async fn update_password_hash(&self, id: IdentityId, hash: &str) -> Result<(), StoreError>;

    async fn update_email(&self, id: IdentityId, email: &str) -> Result<Identity, StoreError>;

    /// Mark the identity deleted; the row and its associations are retained
    async fn soft_delete(&self, id: IdentityId) -> Result<(), StoreError>;

    /// Increment the failed-attempt counter if it still equals `observed`.
    ///
    /// Returns the new counter value, or `StoreError::Conflict` if another
    /// writer got there first.
    async fn increment_failed_attempts(
        &self,
        id: IdentityId,
        observed: u32,
    ) -> Result<u32, StoreError>;

    /// Reset the failed-attempt counter to zero if it still equals `observed`
    async fn reset_failed_attempts(&self, id: IdentityId, observed: u32)
        -> Result<(), StoreError>;

    /// Associate a claim with an identity. Adding an existing pair is a no-op.
    async fn add_claim_association(
        &self,
        id: IdentityId,
        claim: ClaimId,
    ) -> Result<(), StoreError>;

    /// Remove an association, refusing to leave the identity without claims
    async fn remove_claim_association(
        &self,
        id: IdentityId,
        claim: ClaimId,
    ) -> Result<(), StoreError>;

    /// Claim names held by the identity, in association insertion order
    async fn resolve_claim_names(&self, id: IdentityId) -> Result<Vec<String>, StoreError>;
}
