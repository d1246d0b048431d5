pub mod admin;
pub mod auth;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod permission;
pub mod repository;
pub mod todos;
pub mod validate;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
};
use tracing::error;

use crate::auth::{AppState, AppStateInner};
use crate::error::AccessError;
use crate::middleware::require_auth;

/// Full HTTP surface. The binary layers CORS and tracing on top.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/todos", get(todos::list_todos).post(todos::create_todo))
        .route("/api/todos/{id}", put(todos::update_todo).delete(todos::delete_todo))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/todos", get(admin::list_todos))
        .route("/api/admin/users/{id}/role", patch(admin::set_user_role))
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn health() -> &'static str {
    "ok"
}

/// Run store work off the async runtime.
pub(crate) async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, AccessError>
where
    F: FnOnce(&AppStateInner) -> Result<T, AccessError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&*state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AccessError::Store(anyhow::anyhow!("blocking task failed: {}", e))
        })?
}
