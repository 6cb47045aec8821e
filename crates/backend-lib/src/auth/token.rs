// ============================
// crates/backend-lib/src/auth/token.rs
// ============================
//! Signed, time-bound bearer tokens.
//!
//! Tokens are HMAC-signed JWTs. Nothing about an issued token is kept on the
//! server; a token is valid while its signature verifies and `exp` lies in
//! the future.

use crate::config::{TokenAlgorithm, TokenSettings};
use crate::error::AppError;
use crate::identity::{Identity, IdentityId};
use chrono::{DateTime, Utc};
use identity_common::{ClaimSetResponse, TokenResponse};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a token was refused. Callers outside this module only ever see
/// [`AppError::Unauthorized`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature does not verify")]
    BadSignature,

    #[error("token algorithm is not accepted")]
    WrongAlgorithm,

    #[error("token is missing required claim '{0}'")]
    MissingClaim(String),

    #[error("token has expired")]
    Expired,

    #[error("token issuer is not accepted")]
    WrongIssuer,

    #[error("token could not be encoded: {0}")]
    Encoding(String),
}

/// JWT payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub username: String,
    pub email: String,
    pub claims: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// A freshly signed token and its expiry instant
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        TokenResponse {
            token: issued.token,
            expires_at: issued.expires_at,
        }
    }
}

/// The verified content of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSet {
    pub subject: IdentityId,
    pub username: String,
    pub email: String,
    pub claims: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

impl ClaimSet {
    /// Exact-name membership; claims have no hierarchy
    pub fn has_claim(&self, name: &str) -> bool {
        self.claims.iter().any(|c| c == name)
    }

    pub fn require(&self, name: &str) -> Result<(), AppError> {
        if self.has_claim(name) {
            Ok(())
        } else {
            Err(AppError::Forbidden(name.to_string()))
        }
    }
}

impl From<ClaimSet> for ClaimSetResponse {
    fn from(set: ClaimSet) -> Self {
        ClaimSetResponse {
            subject: set.subject.to_string(),
            username: set.username,
            email: set.email,
            claims: set.claims,
            expires_at: set.expires_at,
        }
    }
}

fn algorithm(alg: TokenAlgorithm) -> Algorithm {
    match alg {
        TokenAlgorithm::HS256 => Algorithm::HS256,
        TokenAlgorithm::HS384 => Algorithm::HS384,
        TokenAlgorithm::HS512 => Algorithm::HS512,
    }
}

/// Signs tokens for authenticated identities
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    header: Header,
    ttl_secs: i64,
    issuer: Option<String>,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.header.alg)
            .field("ttl_secs", &self.ttl_secs)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(settings: &TokenSettings) -> Self {
        Self {
            key: EncodingKey::from_secret(settings.secret.as_bytes()),
            header: Header::new(algorithm(settings.algorithm)),
            ttl_secs: i64::try_from(settings.ttl_secs).unwrap_or(i64::MAX),
            issuer: settings.issuer.clone(),
        }
    }

    /// Sign `claims` for `identity`, valid from `now` for the configured TTL
    pub fn issue(
        &self,
        identity: &Identity,
        claims: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let iat = now.timestamp();
        let exp = iat
            .checked_add(self.ttl_secs)
            .ok_or_else(|| TokenError::Encoding("expiry out of range".to_string()))?;
        let expires_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| TokenError::Encoding("expiry out of range".to_string()))?;

        let payload = TokenClaims {
            sub: identity.id.to_string(),
            username: identity.username.clone(),
            email: identity.email.clone(),
            claims,
            iat,
            exp,
            iss: self.issuer.clone(),
        };
        let token = encode(&self.header, &payload, &self.key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }
}

/// Checks signature, algorithm, issuer and expiry of presented tokens
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    pub fn new(settings: &TokenSettings) -> Self {
        let mut validation = Validation::new(algorithm(settings.algorithm));
        // Expiry is compared against the caller-supplied instant in `verify`
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        if let Some(issuer) = &settings.issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
        }
    }

    /// Verify `token` as of `now`
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<ClaimSet, TokenError> {
        let data = decode::<TokenClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::InvalidAlgorithm => TokenError::WrongAlgorithm,
                ErrorKind::InvalidIssuer => TokenError::WrongIssuer,
                ErrorKind::MissingRequiredClaim(claim) => TokenError::MissingClaim(claim.clone()),
                _ => TokenError::Malformed,
            }
        })?;
        let claims = data.claims;

        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        let subject = claims.sub.parse().map_err(|_| TokenError::Malformed)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(TokenError::Malformed)?;

        Ok(ClaimSet {
            subject,
            username: claims.username,
            email: claims.email,
            claims: claims.claims,
            expires_at,
        })
    }
}
