// ============================
// crates/backend-lib/src/auth/service_impl.rs
// ============================
//! `AuthenticationEngine`: registration, login and token authorization over
//! an [`IdentityStore`].
use crate::auth::claims::ClaimAuthority;
use crate::auth::clock::{Clock, SystemClock};
use crate::auth::lockout::{LockState, LockoutTracker, Reservation};
use crate::auth::password::CredentialHasher;
use crate::auth::service::AuthService;
use crate::auth::token::{ClaimSet, IssuedToken, TokenIssuer, TokenVerifier};
use crate::config::{BootstrapAdmin, Settings};
use crate::error::AppError;
use crate::identity::{Claim, Identity, NewIdentity};
use crate::metrics::{IDENTITY_REGISTERED, LOGIN_FAILED, LOGIN_SUCCEEDED, TOKEN_REJECTED};
use crate::storage::{IdentityStore, StoreError};
use crate::validation::{validate_email, validate_username, PasswordPolicy};
use async_trait::async_trait;
use identity_common::{RegisterRequest, UserProfile};
use metrics::counter;
use std::sync::Arc;
use tracing::{info, warn};
use zeroize::Zeroizing;

/// Orchestrates policy, hashing, lockout, claims and tokens.
pub struct AuthenticationEngine<S: ?Sized> {
    store: Arc<S>,
    policy: PasswordPolicy,
    hasher: Arc<CredentialHasher>,
    claims: ClaimAuthority,
    lockout: LockoutTracker,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    clock: Arc<dyn Clock>,
}

impl<S: IdentityStore + ?Sized + 'static> AuthenticationEngine<S> {
    pub fn new(store: Arc<S>, settings: &Settings) -> Result<Self, AppError> {
        let hasher = CredentialHasher::new(&settings.hashing)
            .map_err(|e| AppError::Hashing(e.to_string()))?;

        Ok(Self {
            store,
            policy: settings.password_policy.clone(),
            hasher: Arc::new(hasher),
            claims: ClaimAuthority::default(),
            lockout: LockoutTracker::new(settings.lockout.clone()),
            issuer: TokenIssuer::new(&settings.token),
            verifier: TokenVerifier::new(&settings.token),
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Seed the reference claims
    pub async fn bootstrap(&self) -> Result<(), AppError> {
        self.claims.bootstrap(&*self.store).await
    }

    /// Make sure the configured administrator exists and holds the privileged
    /// claim. Runs on every start; an existing account keeps its password.
    pub async fn bootstrap_admin(&self, admin: &BootstrapAdmin) -> Result<(), AppError> {
        if let Some(existing) = self.store.find_by_username(&admin.username).await? {
            self.claims
                .assign_default(&*self.store, existing.id, true)
                .await?;
            tracing::debug!("bootstrap administrator {} already present", existing.id);
            return Ok(());
        }

        let request = RegisterRequest {
            username: admin.username.clone(),
            email: admin.email.clone(),
            password: admin.password.clone(),
        };
        let profile = self.register(request, true).await?;
        info!("Created bootstrap administrator {}", profile.id);
        Ok(())
    }

    async fn find(&self, username: &str) -> Result<Identity, AppError> {
        self.store
            .find_by_username(username)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn to_profile(&self, identity: &Identity) -> Result<UserProfile, AppError> {
        let claims = self.claims.resolve_claims(&*self.store, identity.id).await?;
        Ok(identity.to_profile(claims))
    }

    async fn hash_password(&self, plain: Zeroizing<String>) -> Result<String, AppError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await?
            .map_err(|e| AppError::Hashing(e.to_string()))
    }

    async fn verify_password(
        &self,
        hash: String,
        plain: Zeroizing<String>,
    ) -> Result<bool, AppError> {
        let hasher = Arc::clone(&self.hasher);
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&hash, &plain)).await?)
    }

    async fn verify_dummy(&self, plain: Zeroizing<String>) -> Result<bool, AppError> {
        let hasher = Arc::clone(&self.hasher);
        Ok(tokio::task::spawn_blocking(move || hasher.verify_dummy(&plain)).await?)
    }
}

#[async_trait]
impl<S: IdentityStore + ?Sized + 'static> AuthService for AuthenticationEngine<S> {
    #[tracing::instrument(skip_all, fields(username = %request.username, privileged = privileged))]
    async fn register(
        &self,
        request: RegisterRequest,
        privileged: bool,
    ) -> Result<UserProfile, AppError> {
        let RegisterRequest {
            username,
            email,
            password,
        } = request;
        let password = Zeroizing::new(password);

        validate_username(&username)?;
        validate_email(&email)?;
        self.policy.validate(&password)?;

        let password_hash = self.hash_password(password).await?;
        let identity = self
            .store
            .create_identity(
                NewIdentity {
                    username,
                    email,
                    password_hash,
                },
                self.claims.default_claim(privileged),
            )
            .await?;

        counter!(IDENTITY_REGISTERED).increment(1);
        info!("Registered identity {}", identity.id);
        self.to_profile(&identity).await
    }

    #[tracing::instrument(skip(self, password))]
    async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AppError> {
        if username.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "username and password must be supplied".to_string(),
            ));
        }
        let password = Zeroizing::new(password.to_string());

        let Some(identity) = self.store.find_by_username(username).await? else {
            // Same work as a wrong password so timing does not reveal the account
            self.verify_dummy(password).await?;
            counter!(LOGIN_FAILED).increment(1);
            warn!("Login failed: unknown username");
            return Err(AppError::InvalidCredentials);
        };

        // Take a slot before any hash work so a burst cannot outrun the threshold
        let reserved = match self.lockout.reserve(&*self.store, &identity).await? {
            Reservation::Granted(reserved) => reserved,
            Reservation::Locked => {
                counter!(LOGIN_FAILED).increment(1);
                warn!("Login rejected: account locked");
                return Err(AppError::AccountLocked);
            },
        };

        if !self
            .verify_password(identity.password_hash.clone(), password)
            .await?
        {
            let state = self.lockout.record_failure(&identity, reserved);
            counter!(LOGIN_FAILED).increment(1);
            warn!(?state, "Login failed: password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        self.lockout
            .record_success(&*self.store, &identity, reserved)
            .await?;

        let claims = self.claims.resolve_claims(&*self.store, identity.id).await?;
        let issued = self
            .issuer
            .issue(&identity, claims, self.clock.now())
            .map_err(|e| AppError::Internal(e.to_string()))?;

        counter!(LOGIN_SUCCEEDED).increment(1);
        info!("Login succeeded for {}", identity.id);
        Ok(issued)
    }

    fn authorize(&self, token: &str) -> Result<ClaimSet, AppError> {
        self.verifier.verify(token, self.clock.now()).map_err(|e| {
            counter!(TOKEN_REJECTED).increment(1);
            warn!("Token rejected: {}", e);
            AppError::Unauthorized
        })
    }

    async fn profile(&self, username: &str) -> Result<UserProfile, AppError> {
        let identity = self.find(username).await?;
        self.to_profile(&identity).await
    }

    #[tracing::instrument(skip(self, old_password, new_password))]
    async fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let old_password = Zeroizing::new(old_password.to_string());
        let new_password = Zeroizing::new(new_password.to_string());

        let identity = self.find(username).await?;
        if self.lockout.state(&identity) == LockState::Locked {
            return Err(AppError::AccountLocked);
        }
        self.policy.validate(&new_password)?;

        if !self
            .verify_password(identity.password_hash.clone(), old_password)
            .await?
        {
            warn!("Password change rejected: current password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        let hash = self.hash_password(new_password).await?;
        self.store.update_password_hash(identity.id, &hash).await?;
        info!("Password changed for {}", identity.id);
        Ok(())
    }

    async fn update_email(&self, username: &str, email: &str) -> Result<UserProfile, AppError> {
        validate_email(email)?;
        let identity = self.find(username).await?;
        let updated = self.store.update_email(identity.id, email).await?;
        info!("Email updated for {}", updated.id);
        self.to_profile(&updated).await
    }

    async fn delete(&self, username: &str) -> Result<(), AppError> {
        let identity = self.find(username).await?;
        self.store.soft_delete(identity.id).await?;
        info!("Identity {} deleted", identity.id);
        Ok(())
    }

    async fn unlock(&self, username: &str) -> Result<(), AppError> {
        let identity = self.find(username).await?;
        self.lockout.unlock(&*self.store, identity.id).await?;
        info!("Identity {} unlocked", identity.id);
        Ok(())
    }

    async fn list_claims(&self) -> Result<Vec<Claim>, AppError> {
        Ok(self.store.list_claims().await?)
    }

    async fn define_claim(&self, name: &str) -> Result<Claim, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("claim name must be supplied".to_string()));
        }
        match self.store.create_claim(name).await {
            Ok(claim) => {
                info!("Defined claim {} ({})", claim.name, claim.id);
                Ok(claim)
            },
            Err(StoreError::Duplicate(_)) => Err(AppError::Validation(format!(
                "claim '{name}' already exists"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn grant_claim(&self, username: &str, claim: &str) -> Result<UserProfile, AppError> {
        let identity = self.find(username).await?;
        self.claims.grant(&*self.store, identity.id, claim).await?;
        info!("Granted {} to {}", claim, identity.id);
        self.to_profile(&identity).await
    }

    async fn revoke_claim(&self, username: &str, claim: &str) -> Result<UserProfile, AppError> {
        let identity = self.find(username).await?;
        self.claims.revoke(&*self.store, identity.id, claim).await?;
        info!("Revoked {} from {}", claim, identity.id);
        self.to_profile(&identity).await
    }
}
