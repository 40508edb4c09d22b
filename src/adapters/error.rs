use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::application::error::ApplicationError;

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApplicationError::Validation(ref msg) => {
                warn!("Validation failed: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            ApplicationError::PayloadTooLarge { size, max } => {
                warn!(size, max, "File too large");
                (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    format!("File exceeds the {} byte limit", max),
                )
            }
            ApplicationError::NotFound => {
                warn!("Resource not found");
                (StatusCode::NOT_FOUND, "Resource not found".to_string())
            }
            ApplicationError::Conflict(ref msg) => {
                warn!("Conflict: {}", msg);
                (StatusCode::CONFLICT, msg.clone())
            }
            ApplicationError::Unauthorized => {
                warn!("Unauthorized access attempt");
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            ApplicationError::Storage(ref msg) => {
                error!("Object storage error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Object storage unavailable".to_string(),
                )
            }
            ApplicationError::DatabaseError(ref msg) => {
                error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApplicationError::InternalError(ref msg) => {
                error!("Internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Malformed or mistyped JSON bodies become a 400 with the usual `{"error": ...}` body.
impl From<JsonRejection> for ApplicationError {
    fn from(rejection: JsonRejection) -> Self {
        ApplicationError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}
