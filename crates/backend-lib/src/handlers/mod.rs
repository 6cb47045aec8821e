// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers. Each one is a thin adapter over [`crate::auth::AuthService`].

pub mod claims;
pub mod user;
