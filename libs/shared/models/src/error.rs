use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A booking request the scheduling rules turned down. `context` carries
    /// whatever the caller needs to explain it (open interval, conflicting id).
    #[error("Rejected: {reason}")]
    Rejected { reason: String, context: Value },

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::Rejected { reason, context } => (
                StatusCode::CONFLICT,
                json!({ "error": reason, "context": context }),
            ),
            AppError::InvalidTransition(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": msg }))
            }
            AppError::ExternalService(msg) => (StatusCode::BAD_GATEWAY, json!({ "error": msg })),
        };

        if status.is_server_error() {
            tracing::error!("Error: {}: {}", status, self);
        } else {
            tracing::debug!("Request failed: {}: {}", status, self);
        }

        (status, Json(body)).into_response()
    }
}
