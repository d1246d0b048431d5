use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use docket_types::api::{ErrorResponse, FieldError};

/// Failure kinds raised by the repository and the credential verifier.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("access denied")]
    AccessDenied,

    #[error("missing or invalid credential")]
    Unauthorized,

    #[error("{0} already in use")]
    Conflict(&'static str),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl AccessError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Validation(errors) => ErrorResponse {
                error: "Validation failed".into(),
                errors,
            },
            Self::NotFound(entity) => ErrorResponse {
                error: format!("{} not found", capitalize(entity)),
                errors: vec![],
            },
            Self::AccessDenied => ErrorResponse {
                error: "Access denied".into(),
                errors: vec![],
            },
            Self::Unauthorized => ErrorResponse {
                error: "Unauthorized".into(),
                errors: vec![],
            },
            Self::Conflict(field) => ErrorResponse {
                error: format!("{} already in use", capitalize(field)),
                errors: vec![],
            },
            // Internal detail stays in the log.
            Self::Store(e) => {
                error!("Store failure: {:#}", e);
                ErrorResponse {
                    error: "Server error".into(),
                    errors: vec![],
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AccessError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid("body", rejection.body_text())
    }
}

impl From<PathRejection> for AccessError {
    fn from(rejection: PathRejection) -> Self {
        Self::invalid("id", rejection.body_text())
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
