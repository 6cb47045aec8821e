// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for Prometheus metric keys
pub const IDENTITY_REGISTERED: &str = "identity.registered";
pub const LOGIN_SUCCEEDED: &str = "login.succeeded";
pub const LOGIN_FAILED: &str = "login.failed";
pub const LOGIN_LOCKED: &str = "login.locked";
pub const TOKEN_REJECTED: &str = "token.rejected";
