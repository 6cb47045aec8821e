// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the identity service HTTP surface.

pub mod auth;

pub use auth::{bearer_token, require_administrator, require_token, ACCESS_TOKEN_HEADER};
