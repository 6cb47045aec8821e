// ============================
// crates/backend-lib/src/identity.rs
// ============================
//! Identity and claim records as held by the persistence boundary.

use chrono::{DateTime, Utc};
use identity_common::{ClaimDto, UserProfile};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Name of the privileged claim seeded at bootstrap
pub const ADMINISTRATOR_CLAIM: &str = "Administrator";
/// Name of the standard claim seeded at bootstrap
pub const USER_CLAIM: &str = "User";

/// Identifier of a persisted identity; doubles as the token subject.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(Uuid);

impl IdentityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for IdentityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Stable numeric identifier of a claim reference row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(pub u32);

impl ClaimId {
    /// Seeded privileged claim
    pub const ADMINISTRATOR: ClaimId = ClaimId(1);
    /// Seeded standard claim
    pub const USER: ClaimId = ClaimId(2);
}

impl std::fmt::Display for ClaimId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named permission tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub name: String,
}

impl From<&Claim> for ClaimDto {
    fn from(claim: &Claim) -> Self {
        ClaimDto {
            id: claim.id.0,
            name: claim.name.clone(),
        }
    }
}

/// The persisted user/account record.
///
/// Rows are never physically removed; `deleted` hides them from lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub failed_login_attempts: u32,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Project into the wire profile, attaching the resolved claim names.
    pub fn to_profile(&self, claims: Vec<String>) -> UserProfile {
        UserProfile {
            id: self.id.to_string(),
            username: self.username.clone(),
            email: self.email.clone(),
            claims,
        }
    }
}

/// Fields required to create an identity row.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}
