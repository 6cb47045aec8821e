// ============================
// crates/backend-lib/src/auth/lockout.rs
// ============================
//! Failed-login lockout.
//!
//! The counter lives on the identity row, not in process memory, and every
//! change goes through the store's compare-and-set operations. A login takes
//! its slot on the counter *before* the password is checked, so no more than
//! `threshold` guesses are ever verified between two resets, however many
//! requests arrive at once. There is no timed unlock: an account leaves
//! `Locked` only through a successful in-budget login or [`LockoutTracker::unlock`].

use crate::identity::{Identity, IdentityId};
use crate::metrics::LOGIN_LOCKED;
use crate::storage::{IdentityStore, StoreError};
use metrics::counter;
use serde::{Deserialize, Serialize};

/// Default number of consecutive failures that locks an account
const DEFAULT_THRESHOLD: u32 = 4;

/// Compare-and-set rounds allowed on top of the threshold before giving up
const MAX_CAS_ROUNDS: usize = 8;

/// Lockout configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutPolicy {
    /// The failure that brings the counter to this value locks the account
    pub threshold: u32,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Per-identity login state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Open,
    Locked,
}

/// Outcome of asking to verify one more password
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The attempt is already counted; holds the counter value it produced
    Granted(u32),
    /// The counter had reached the threshold; nothing was counted
    Locked,
}

/// Tracks failed logins against the identity store
#[derive(Debug, Clone)]
pub struct LockoutTracker {
    policy: LockoutPolicy,
}

impl LockoutTracker {
    pub fn new(policy: LockoutPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    fn state_for(&self, attempts: u32) -> LockState {
        if attempts >= self.policy.threshold {
            LockState::Locked
        } else {
            LockState::Open
        }
    }

    fn max_rounds(&self) -> usize {
        (self.policy.threshold as usize).saturating_add(MAX_CAS_ROUNDS)
    }

    /// State implied by the identity's current counter
    pub fn state(&self, identity: &Identity) -> LockState {
        self.state_for(identity.failed_login_attempts)
    }

    /// Count the attempt up front, or refuse it if the account is locked.
    ///
    /// The slot stays counted unless [`record_success`](Self::record_success)
    /// clears it, so an attempt abandoned mid-verification counts as a failure.
    pub async fn reserve<S: IdentityStore + ?Sized>(
        &self,
        store: &S,
        identity: &Identity,
    ) -> Result<Reservation, StoreError> {
        let mut observed = identity.failed_login_attempts;
        for _ in 0..self.max_rounds() {
            if self.state_for(observed) == LockState::Locked {
                return Ok(Reservation::Locked);
            }
            match store.increment_failed_attempts(identity.id, observed).await {
                Ok(attempts) => return Ok(Reservation::Granted(attempts)),
                Err(StoreError::Conflict) => {
                    observed = current_attempts(store, identity.id).await?;
                },
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::Conflict)
    }

    /// Settle a granted attempt whose password did not match.
    ///
    /// The counter already holds the failure; this only reports the state it
    /// left behind.
    pub fn record_failure(&self, identity: &Identity, reserved: u32) -> LockState {
        let state = self.state_for(reserved);
        if state == LockState::Locked {
            counter!(LOGIN_LOCKED).increment(1);
            tracing::warn!(
                username = %identity.username,
                attempts = reserved,
                "account locked after repeated failed logins"
            );
        }
        state
    }

    /// Settle a granted attempt whose password matched: clear the counter,
    /// including slots other in-flight attempts hold.
    pub async fn record_success<S: IdentityStore + ?Sized>(
        &self,
        store: &S,
        identity: &Identity,
        reserved: u32,
    ) -> Result<(), StoreError> {
        let mut observed = reserved;
        for _ in 0..self.max_rounds() {
            match store.reset_failed_attempts(identity.id, observed).await {
                Ok(()) => return Ok(()),
                Err(StoreError::Conflict) => {
                    observed = current_attempts(store, identity.id).await?;
                },
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::Conflict)
    }

    /// Administrative reset, regardless of current state
    pub async fn unlock<S: IdentityStore + ?Sized>(
        &self,
        store: &S,
        id: IdentityId,
    ) -> Result<(), StoreError> {
        for _ in 0..self.max_rounds() {
            let observed = current_attempts(store, id).await?;
            match store.reset_failed_attempts(id, observed).await {
                Ok(()) => return Ok(()),
                Err(StoreError::Conflict) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::Conflict)
    }
}

async fn current_attempts<S: IdentityStore + ?Sized>(
    store: &S,
    id: IdentityId,
) -> Result<u32, StoreError> {
    store
        .find_by_id(id)
        .await?
        .map(|identity| identity.failed_login_attempts)
        .ok_or(StoreError::NotFound)
}
