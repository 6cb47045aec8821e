// ============================
// crates/backend-lib/src/handlers/user.rs
// ============================
//! `/user` routes.
use crate::auth::ClaimSet;
use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use identity_common::{
    ClaimSetResponse, LoginRequest, RegisterRequest, TokenResponse, UpdatePasswordRequest,
    UpdateProfileRequest, UserProfile, UsernameRequest,
};
use std::sync::Arc;

/// `POST /user`
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let profile = state.auth.register(request, false).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// `POST /user/add-admin-user`
pub async fn add_admin_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<ClaimSet>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    tracing::info!("{} registering privileged identity {}", caller.username, request.username);
    let profile = state.auth.register(request, true).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// `POST /user/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let issued = state.auth.login(&request.username, &request.password).await?;
    Ok(Json(issued.into()))
}

/// `GET /user/get-by-username?username=`
pub async fn get_by_username(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsernameRequest>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.auth.profile(&query.username).await?))
}

/// `PUT /user/update-password`, always for the caller's own account
pub async fn update_password(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<ClaimSet>,
    Json(request): Json<UpdatePasswordRequest>,
) -> Result<StatusCode, AppError> {
    state
        .auth
        .change_password(&caller.username, &request.old_password, &request.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /user/update-user`, always for the caller's own account
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<ClaimSet>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(
        state.auth.update_email(&caller.username, &request.email).await?,
    ))
}

/// `DELETE /user`
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UsernameRequest>,
) -> Result<StatusCode, AppError> {
    state.auth.delete(&request.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /user/unlock`
pub async fn unlock_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UsernameRequest>,
) -> Result<StatusCode, AppError> {
    state.auth.unlock(&request.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /user/authorize`
pub async fn authorize(Extension(caller): Extension<ClaimSet>) -> Json<ClaimSetResponse> {
    Json(caller.into())
}
