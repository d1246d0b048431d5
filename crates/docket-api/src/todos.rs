use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use docket_types::api::{CreateTodoRequest, TodoQuery, UpdateTodoRequest};

use crate::auth::AppState;
use crate::error::AccessError;
use crate::extract::{IdPath, JsonBody};
use crate::permission::Principal;
use crate::repository::Repository;
use crate::run_blocking;

/// GET /api/todos?status=&category=
pub async fn list_todos(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<TodoQuery>,
) -> Result<impl IntoResponse, AccessError> {
    let todos = run_blocking(&state, move |state| {
        Repository::new(&state.db).list_todos(&principal, &query)
    })
    .await?;

    Ok(Json(todos))
}

/// POST /api/todos
pub async fn create_todo(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    JsonBody(req): JsonBody<CreateTodoRequest>,
) -> Result<impl IntoResponse, AccessError> {
    let todo = run_blocking(&state, move |state| {
        Repository::new(&state.db).create_todo(&principal, req)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(todo)))
}

/// PUT /api/todos/{id}
pub async fn update_todo(
    State(state): State<AppState>,
    IdPath(id): IdPath<Uuid>,
    Extension(principal): Extension<Principal>,
    JsonBody(req): JsonBody<UpdateTodoRequest>,
) -> Result<impl IntoResponse, AccessError> {
    let todo = run_blocking(&state, move |state| {
        Repository::new(&state.db).update_todo(&principal, id, req)
    })
    .await?;

    Ok(Json(todo))
}

/// DELETE /api/todos/{id}
pub async fn delete_todo(
    State(state): State<AppState>,
    IdPath(id): IdPath<Uuid>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, AccessError> {
    let confirmation = run_blocking(&state, move |state| {
        Repository::new(&state.db).delete_todo(&principal, id)
    })
    .await?;

    Ok(Json(confirmation))
}
