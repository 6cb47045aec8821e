// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between identity service clients and the server.
//! This module defines the JSON request and response bodies of the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of a registration request (`POST /user`, `POST /user/add-admin-user`)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    /// Unique, case-sensitive login name (immutable once created)
    pub username: String,
    /// Unique email address
    pub email: String,
    /// Plaintext password, checked against the password policy
    pub password: String,
}

/// Body of a login request (`POST /user/login`)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login response
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TokenResponse {
    /// Compact signed bearer token
    pub token: String,
    /// Instant after which the token is rejected
    pub expires_at: DateTime<Utc>,
}

/// Public view of an identity. Never carries the password hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Claim names held by the identity, in grant order
    pub claims: Vec<String>,
}

/// Body of `PUT /user/update-password`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Body of `PUT /user/update-user`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateProfileRequest {
    pub email: String,
}

/// Body of administrative requests that target a single account
/// (`DELETE /user`, `POST /user/unlock`)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UsernameRequest {
    pub username: String,
}

/// A claim reference row
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClaimDto {
    pub id: u32,
    pub name: String,
}

/// Body of `POST /claims`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DefineClaimRequest {
    pub name: String,
}

/// Body of `POST /claims/grant` and `DELETE /claims/grant`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClaimGrantRequest {
    pub username: String,
    pub claim: String,
}

/// Claims carried by a verified token, as returned by `GET /user/authorize`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClaimSetResponse {
    pub subject: String,
    pub username: String,
    pub email: String,
    pub claims: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

/// Error body returned for every non-2xx response
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Machine-readable code plus a caller-safe message
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
