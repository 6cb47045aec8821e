// ============================
// crates/backend-lib/src/handlers/claims.rs
// ============================
//! `/claims` routes.
use crate::error::AppError;
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use identity_common::{ClaimDto, ClaimGrantRequest, DefineClaimRequest, UserProfile};
use std::sync::Arc;

pub async fn list_claims(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ClaimDto>>, AppError> {
    let claims = state.auth.list_claims().await?;
    Ok(Json(claims.iter().map(ClaimDto::from).collect()))
}

pub async fn define_claim(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DefineClaimRequest>,
) -> Result<(StatusCode, Json<ClaimDto>), AppError> {
    let claim = state.auth.define_claim(&request.name).await?;
    Ok((StatusCode::CREATED, Json(ClaimDto::from(&claim))))
}

pub async fn grant_claim(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClaimGrantRequest>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(
        state.auth.grant_claim(&request.username, &request.claim).await?,
    ))
}

pub async fn revoke_claim(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClaimGrantRequest>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(
        state.auth.revoke_claim(&request.username, &request.claim).await?,
    ))
}
