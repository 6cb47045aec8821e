// ============================
// identity-backend-lib/src/router.rs
// ============================
//! HTTP router.
use crate::handlers::{claims, user};
use crate::middleware::{require_administrator, require_token};
use crate::AppState;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Create the identity service router
pub fn create_router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/user/add-admin-user", post(user::add_admin_user))
        .route("/user", delete(user::delete_user))
        .route("/user/unlock", post(user::unlock_user))
        .route("/claims", post(claims::define_claim))
        .route(
            "/claims/grant",
            post(claims::grant_claim).delete(claims::revoke_claim),
        )
        .route_layer(from_fn(require_administrator));

    let authenticated = Router::new()
        .route("/user/get-by-username", get(user::get_by_username))
        .route("/user/update-password", put(user::update_password))
        .route("/user/update-user", put(user::update_user))
        .route("/user/authorize", get(user::authorize))
        .route("/claims/get-all", get(claims::list_claims))
        .merge(admin)
        .route_layer(from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/user", post(user::register))
        .route("/user/login", post(user::login))
        .merge(authenticated)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
