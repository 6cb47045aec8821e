// ============================
// crates/backend-lib/src/middleware/auth.rs
// ============================
//! Bearer-token guards.
use crate::auth::ClaimSet;
use crate::error::AppError;
use crate::identity::ADMINISTRATOR_CLAIM;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Header accepted when `Authorization` is absent
pub const ACCESS_TOKEN_HEADER: &str = "access_token";

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the presented token, preferring `Authorization: Bearer`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        return value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|t| !t.is_empty());
    }

    headers
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|v| v.strip_prefix(BEARER_PREFIX).unwrap_or(v).trim())
        .filter(|t| !t.is_empty())
}

/// Verify the bearer token and expose its [`ClaimSet`] to the handler
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = {
        let token = bearer_token(request.headers()).ok_or_else(|| {
            tracing::debug!("Request without bearer token");
            AppError::Unauthorized
        })?;
        state.auth.authorize(token)?
    };

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Only callers holding the privileged claim get through.
///
/// Must run inside [`require_token`].
pub async fn require_administrator(request: Request, next: Next) -> Result<Response, AppError> {
    let claims = request
        .extensions()
        .get::<ClaimSet>()
        .ok_or(AppError::Unauthorized)?;
    claims.require(ADMINISTRATOR_CLAIM)?;
    Ok(next.run(request).await)
}
