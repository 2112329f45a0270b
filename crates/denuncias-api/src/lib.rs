pub mod auth;
pub mod complaints;
pub mod error;
pub mod middleware;
pub mod password;
pub mod storage;
pub mod token;
pub mod uploads;
pub mod users;

use std::sync::Arc;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use denuncias_db::Database;

use crate::error::ApiError;
use crate::storage::ImageStore;
use crate::token::TokenIssuer;

pub type AppState = Arc<AppStateInner>;

/// Everything a handler can reach. Built once at startup and injected
/// through axum's `State`.
pub struct AppStateInner {
    pub db: Database,
    pub images: ImageStore,
    pub tokens: TokenIssuer,
}

/// Build the HTTP surface.
///
/// Access is declared per route by which router it lands in: `public_routes`
/// are open, `protected_routes` sit behind [`middleware::require_auth`].
/// The `/api/crear_user`, `/api/login_user`, `/api/listar_users` and
/// `/api/denuncias` paths are kept for older clients.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/api/users", post(auth::register))
        .route("/api/crear_user", post(auth::register))
        .route("/login", post(auth::login))
        .route("/api/login_user", post(auth::login))
        .route("/validate-token", post(auth::validate_token))
        .route("/api/complaints", post(complaints::create_complaint))
        .route("/api/denuncias", post(complaints::create_complaint))
        .route("/uploads/{filename}", get(uploads::serve_upload));

    let protected_routes = Router::new()
        .route("/api/users", get(users::list_users))
        .route("/api/listar_users", get(users::list_users))
        .route("/api/complaints", get(complaints::list_complaints))
        .route(
            "/api/complaints/{id}",
            get(complaints::get_complaint).delete(complaints::delete_complaint),
        )
        .route("/api/denuncias", get(complaints::list_complaints))
        .route(
            "/api/denuncias/{id}",
            get(complaints::get_complaint).delete(complaints::delete_complaint),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn home() -> &'static str {
    "Complaints API is running."
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Run blocking store work (SQLite, Argon2) off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
