use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilmError {
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },
    #[error("film {0} does not exist")]
    NotFound(i32),
    #[error("failed to {0}")]
    OperationFailed(&'static str),
    #[error("storage error: {0}")]
    Storage(String),
}

impl FilmError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { field, message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            FilmError::Validation { .. } => StatusCode::BAD_REQUEST,
            FilmError::NotFound(_) => StatusCode::NOT_FOUND,
            FilmError::OperationFailed(_) | FilmError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }
}

impl From<sea_orm::DbErr> for FilmError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Malformed or mistyped request bodies are validation failures.
impl From<JsonRejection> for FilmError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation("body", rejection.body_text())
    }
}

impl IntoResponse for FilmError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

pub type FilmResult<T> = Result<T, FilmError>;
