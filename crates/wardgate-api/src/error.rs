//! Maps `AppError` to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use wardgate_core::error::{AppError, ErrorKind};

/// Standard error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// An [`AppError`] on its way to the client.
#[derive(Debug)]
pub struct ApiError {
    pub inner: AppError,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }
}

impl From<AppError> for ApiError {
    fn from(inner: AppError) -> Self {
        Self {
            inner,
            details: None,
        }
    }
}

/// Status, error code, and the message shown to the caller. Authentication
/// and authorization failures never reveal their specific reason.
fn render(error: &AppError) -> (StatusCode, &'static str, String) {
    match error.kind {
        ErrorKind::Validation => (StatusCode::BAD_REQUEST, "validation_error", error.message.clone()),
        ErrorKind::Conflict => (StatusCode::CONFLICT, "conflict", error.message.clone()),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found", error.message.clone()),
        ErrorKind::Authentication => (
            StatusCode::UNAUTHORIZED,
            "authentication_failed",
            "Invalid credentials".to_string(),
        ),
        ErrorKind::SessionExpired => (
            StatusCode::UNAUTHORIZED,
            "session_expired",
            "Session expired; please sign in again".to_string(),
        ),
        ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "forbidden", "Forbidden".to_string()),
        ErrorKind::Timeout => (
            StatusCode::SERVICE_UNAVAILABLE,
            "service_unavailable",
            "Service temporarily unavailable".to_string(),
        ),
        ErrorKind::Database
        | ErrorKind::Configuration
        | ErrorKind::Serialization
        | ErrorKind::Internal => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error".to_string(),
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = render(&self.inner);
        if status.is_server_error() {
            tracing::error!(kind = %self.inner.kind, error = %self.inner.message, "Request failed");
        } else {
            tracing::debug!(kind = %self.inner.kind, error = %self.inner.message, "Request rejected");
        }

        let body = ApiErrorResponse {
            error: code.to_string(),
            message,
            details: self.details,
        };
        (status, Json(body)).into_response()
    }
}
