// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod claims;
pub mod clock;
pub mod lockout;
pub mod password;
pub mod token;
mod service;
mod service_impl;

pub use claims::ClaimAuthority;
pub use clock::{Clock, FixedClock, SystemClock};
pub use lockout::{LockState, LockoutPolicy, LockoutTracker, Reservation};
pub use password::{CredentialHasher, HashError};
pub use service::AuthService;
pub use service_impl::AuthenticationEngine;
pub use token::{ClaimSet, IssuedToken, TokenClaims, TokenError, TokenIssuer, TokenVerifier};
