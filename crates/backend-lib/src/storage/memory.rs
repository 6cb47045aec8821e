// ============================
// crates/backend-lib/src/storage/memory.rs
// ============================
//! In-process identity store.
//!
//! Identity rows live in a `DashMap`, which gives each row its own lock for
//! the compare-and-set counter updates. Unique indexes, claims and the
//! association table sit behind one `RwLock`. Lock order is always
//! tables first, then rows; no guard is ever held across an `.await`.

use super::{IdentityStore, StoreError};
use crate::identity::{Claim, ClaimId, Identity, IdentityId, NewIdentity};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of the identity/claim join table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub identity_id: IdentityId,
    pub claim_id: ClaimId,
}

/// Serializable copy of the whole store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub identities: Vec<Identity>,
    pub claims: Vec<Claim>,
    pub associations: Vec<Association>,
}

#[derive(Debug, Default)]
struct Tables {
    by_username: HashMap<String, IdentityId>,
    by_email: HashMap<String, IdentityId>,
    claims: Vec<Claim>,
    associations: Vec<Association>,
}

impl Tables {
    fn claim(&self, id: ClaimId) -> Option<&Claim> {
        self.claims.iter().find(|c| c.id == id)
    }
}

fn email_key(email: &str) -> String {
    email.to_lowercase()
}

/// Identity store held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    rows: DashMap<IdentityId, Identity>,
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store (indexes included) from a snapshot
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.write();
            for identity in snapshot.identities {
                tables
                    .by_username
                    .insert(identity.username.clone(), identity.id);
                tables.by_email.insert(email_key(&identity.email), identity.id);
                store.rows.insert(identity.id, identity);
            }
            tables.claims = snapshot.claims;
            tables.claims.sort_by_key(|c| c.id);
            tables.associations = snapshot.associations;
        }
        store
    }

    /// Copy the current contents out for persistence
    pub fn snapshot(&self) -> Snapshot {
        let tables = self.tables.read();
        let mut identities: Vec<Identity> =
            self.rows.iter().map(|row| row.value().clone()).collect();
        identities.sort_by_key(|i| i.created_at);
        Snapshot {
            identities,
            claims: tables.claims.clone(),
            associations: tables.associations.clone(),
        }
    }

    fn live_row(&self, id: IdentityId) -> Option<Identity> {
        self.rows
            .get(&id)
            .filter(|row| !row.deleted)
            .map(|row| row.value().clone())
    }
}

#[async_trait]
impl IdentityStore for InMemoryStore {
    async fn seed_claim(&self, id: ClaimId, name: &str) -> Result<Claim, StoreError> {
        let mut tables = self.tables.write();
        if let Some(existing) = tables.claim(id) {
            return Ok(existing.clone());
        }
        if tables.claims.iter().any(|c| c.name == name) {
            return Err(StoreError::Duplicate(format!("claim name {name}")));
        }
        let claim = Claim {
            id,
            name: name.to_string(),
        };
        tables.claims.push(claim.clone());
        tables.claims.sort_by_key(|c| c.id);
        Ok(claim)
    }

    async fn list_claims(&self) -> Result<Vec<Claim>, StoreError> {
        Ok(self.tables.read().claims.clone())
    }

    async fn find_claim_by_name(&self, name: &str) -> Result<Option<Claim>, StoreError> {
        Ok(self
            .tables
            .read()
            .claims
            .iter()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn create_claim(&self, name: &str) -> Result<Claim, StoreError> {
        let mut tables = self.tables.write();
        if tables.claims.iter().any(|c| c.name == name) {
            return Err(StoreError::Duplicate(format!("claim name {name}")));
        }
        let next = tables.claims.iter().map(|c| c.id.0).max().unwrap_or(0) + 1;
        let claim = Claim {
            id: ClaimId(next),
            name: name.to_string(),
        };
        tables.claims.push(claim.clone());
        Ok(claim)
    }

    async fn create_identity(
        &self,
        new: NewIdentity,
        initial_claim: ClaimId,
    ) -> Result<Identity, StoreError> {
        let mut tables = self.tables.write();
        if tables.claim(initial_claim).is_none() {
            return Err(StoreError::NotFound);
        }
        if tables.by_username.contains_key(&new.username) {
            return Err(StoreError::Duplicate("username".to_string()));
        }
        let email = email_key(&new.email);
        if tables.by_email.contains_key(&email) {
            return Err(StoreError::Duplicate("email".to_string()));
        }

        let now = Utc::now();
        let identity = Identity {
            id: IdentityId::new(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            failed_login_attempts: 0,
            deleted: false,
            created_at: now,
            updated_at: now,
        };

        tables.by_username.insert(identity.username.clone(), identity.id);
        tables.by_email.insert(email, identity.id);
        tables.associations.push(Association {
            identity_id: identity.id,
            claim_id: initial_claim,
        });
        self.rows.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        let id = match self.tables.read().by_username.get(username) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.live_row(id))
    }

    async fn find_by_id(&self, id: IdentityId) -> Result<Option<Identity>, StoreError> {
        Ok(self.live_row(id))
    }

    async fn update_password_hash(&self, id: IdentityId, hash: &str) -> Result<(), StoreError> {
        let mut row = self.rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        if row.deleted {
            return Err(StoreError::NotFound);
        }
        row.password_hash = hash.to_string();
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn update_email(&self, id: IdentityId, email: &str) -> Result<Identity, StoreError> {
        let mut tables = self.tables.write();
        let key = email_key(email);
        if let Some(owner) = tables.by_email.get(&key) {
            if *owner != id {
                return Err(StoreError::Duplicate("email".to_string()));
            }
        }

        let mut row = self.rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        if row.deleted {
            return Err(StoreError::NotFound);
        }
        let previous = email_key(&row.email);
        row.email = email.to_string();
        row.updated_at = Utc::now();
        let updated = row.value().clone();
        drop(row);

        tables.by_email.remove(&previous);
        tables.by_email.insert(key, id);
        Ok(updated)
    }

    async fn soft_delete(&self, id: IdentityId) -> Result<(), StoreError> {
        let mut row = self.rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        if row.deleted {
            return Err(StoreError::NotFound);
        }
        row.deleted = true;
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn increment_failed_attempts(
        &self,
        id: IdentityId,
        observed: u32,
    ) -> Result<u32, StoreError> {
        let mut row = self.rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        if row.failed_login_attempts != observed {
            return Err(StoreError::Conflict);
        }
        row.failed_login_attempts = observed.saturating_add(1);
        row.updated_at = Utc::now();
        Ok(row.failed_login_attempts)
    }

    async fn reset_failed_attempts(
        &self,
        id: IdentityId,
        observed: u32,
    ) -> Result<(), StoreError> {
        let mut row = self.rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        if row.failed_login_attempts != observed {
            return Err(StoreError::Conflict);
        }
        if observed != 0 {
            row.failed_login_attempts = 0;
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn add_claim_association(
        &self,
        id: IdentityId,
        claim: ClaimId,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if tables.claim(claim).is_none() || self.live_row(id).is_none() {
            return Err(StoreError::NotFound);
        }
        let association = Association {
            identity_id: id,
            claim_id: claim,
        };
        if !tables.associations.contains(&association) {
            tables.associations.push(association);
        }
        Ok(())
    }

    async fn remove_claim_association(
        &self,
        id: IdentityId,
        claim: ClaimId,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let held = tables
            .associations
            .iter()
            .filter(|a| a.identity_id == id)
            .count();
        let position = tables
            .associations
            .iter()
            .position(|a| a.identity_id == id && a.claim_id == claim)
            .ok_or(StoreError::NotFound)?;
        if held <= 1 {
            return Err(StoreError::LastClaim);
        }
        tables.associations.remove(position);
        Ok(())
    }

    async fn resolve_claim_names(&self, id: IdentityId) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .associations
            .iter()
            .filter(|a| a.identity_id == id)
            .filter_map(|a| tables.claim(a.claim_id))
            .map(|c| c.name.clone())
            .collect())
    }
}
