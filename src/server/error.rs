use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub const USER_NOT_FOUND: &str = "User not found";
pub const ITEM_NOT_FOUND: &str = "Item not found";

#[derive(Debug, Error)]
pub enum AppError {
    /// Lookup by id found no row. Carries the client-facing message.
    #[error("{0}")]
    NotFound(&'static str),

    /// Request body, query or path did not match the expected shape.
    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.to_string()),
            Self::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::Storage(_) => {
                tracing::error!(error = %self, "Request failed");
                // Storage details stay in the log
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
