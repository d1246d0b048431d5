use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use uuid::Uuid;

use docket_types::api::SetRoleRequest;

use crate::auth::AppState;
use crate::error::AccessError;
use crate::extract::{IdPath, JsonBody};
use crate::permission::Principal;
use crate::repository::Repository;
use crate::run_blocking;

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, AccessError> {
    let users = run_blocking(&state, move |state| {
        Repository::new(&state.db).list_users(&principal)
    })
    .await?;

    Ok(Json(users))
}

/// GET /api/admin/todos
pub async fn list_todos(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, AccessError> {
    let todos = run_blocking(&state, move |state| {
        Repository::new(&state.db).list_all_todos_with_owners(&principal)
    })
    .await?;

    Ok(Json(todos))
}

/// PATCH /api/admin/users/{id}/role
pub async fn set_user_role(
    State(state): State<AppState>,
    IdPath(user_id): IdPath<Uuid>,
    Extension(principal): Extension<Principal>,
    JsonBody(req): JsonBody<SetRoleRequest>,
) -> Result<impl IntoResponse, AccessError> {
    let user = run_blocking(&state, move |state| {
        Repository::new(&state.db).set_user_role(&principal, user_id, &req.role)
    })
    .await?;

    Ok(Json(user))
}
