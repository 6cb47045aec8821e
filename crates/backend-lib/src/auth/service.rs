// ============================
// crates/backend-lib/src/auth/service.rs
// ============================
//! The authentication service boundary used by HTTP handlers.
use crate::auth::token::{ClaimSet, IssuedToken};
use crate::error::AppError;
use crate::identity::Claim;
use async_trait::async_trait;
use identity_common::{RegisterRequest, UserProfile};

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an identity holding the privileged claim if `privileged`,
    /// otherwise the standard one
    async fn register(
        &self,
        request: RegisterRequest,
        privileged: bool,
    ) -> Result<UserProfile, AppError>;

    /// Authenticate and mint a bearer token
    async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AppError>;

    /// Verify a presented bearer token. Every rejection is `Unauthorized`.
    fn authorize(&self, token: &str) -> Result<ClaimSet, AppError>;

    async fn profile(&self, username: &str) -> Result<UserProfile, AppError>;

    async fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError>;

    async fn update_email(&self, username: &str, email: &str) -> Result<UserProfile, AppError>;

    /// Logical deletion
    async fn delete(&self, username: &str) -> Result<(), AppError>;

    /// Administrative lockout reset
    async fn unlock(&self, username: &str) -> Result<(), AppError>;

    async fn list_claims(&self) -> Result<Vec<Claim>, AppError>;

    async fn define_claim(&self, name: &str) -> Result<Claim, AppError>;

    async fn grant_claim(&self, username: &str, claim: &str) -> Result<UserProfile, AppError>;

    async fn revoke_claim(&self, username: &str, claim: &str) -> Result<UserProfile, AppError>;
}
