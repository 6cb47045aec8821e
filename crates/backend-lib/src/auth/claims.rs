// ============================
// crates/backend-lib/src/auth/claims.rs
// ============================
//! Claim assignment and lookup.
use crate::error::AppError;
use crate::identity::{Claim, ClaimId, IdentityId, ADMINISTRATOR_CLAIM, USER_CLAIM};
use crate::storage::IdentityStore;

/// Decides which claims an identity holds and resolves them by name
#[derive(Debug, Clone, Copy)]
pub struct ClaimAuthority {
    privileged: ClaimId,
    standard: ClaimId,
}

impl Default for ClaimAuthority {
    fn default() -> Self {
        Self::new(ClaimId::ADMINISTRATOR, ClaimId::USER)
    }
}

impl ClaimAuthority {
    pub fn new(privileged: ClaimId, standard: ClaimId) -> Self {
        Self {
            privileged,
            standard,
        }
    }

    /// The single claim a fresh registration receives
    pub fn default_claim(&self, privileged: bool) -> ClaimId {
        if privileged {
            self.privileged
        } else {
            self.standard
        }
    }

    /// Seed the well-known reference claims. Safe to run on every start.
    pub async fn bootstrap<S: IdentityStore + ?Sized>(&self, store: &S) -> Result<(), AppError> {
        store.seed_claim(ClaimId::ADMINISTRATOR, ADMINISTRATOR_CLAIM).await?;
        store.seed_claim(ClaimId::USER, USER_CLAIM).await?;
        tracing::debug!("reference claims seeded");
        Ok(())
    }

    /// Write the default association for an existing identity
    pub async fn assign_default<S: IdentityStore + ?Sized>(
        &self,
        store: &S,
        id: IdentityId,
        privileged: bool,
    ) -> Result<(), AppError> {
        store
            .add_claim_association(id, self.default_claim(privileged))
            .await?;
        Ok(())
    }

    /// Claim names held by the identity, in the order they were granted
    pub async fn resolve_claims<S: IdentityStore + ?Sized>(
        &self,
        store: &S,
        id: IdentityId,
    ) -> Result<Vec<String>, AppError> {
        Ok(store.resolve_claim_names(id).await?)
    }

    pub async fn grant<S: IdentityStore + ?Sized>(
        &self,
        store: &S,
        id: IdentityId,
        claim_name: &str,
    ) -> Result<Claim, AppError> {
        let claim = lookup(store, claim_name).await?;
        store.add_claim_association(id, claim.id).await?;
        Ok(claim)
    }

    /// Remove a claim; an identity is never left with none
    pub async fn revoke<S: IdentityStore + ?Sized>(
        &self,
        store: &S,
        id: IdentityId,
        claim_name: &str,
    ) -> Result<Claim, AppError> {
        let claim = lookup(store, claim_name).await?;
        store.remove_claim_association(id, claim.id).await?;
        Ok(claim)
    }
}

async fn lookup<S: IdentityStore + ?Sized>(store: &S, claim_name: &str) -> Result<Claim, AppError> {
    store
        .find_claim_by_name(claim_name)
        .await?
        .ok_or_else(|| AppError::Validation(format!("unknown claim '{claim_name}'")))
}
