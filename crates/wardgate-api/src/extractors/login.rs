//! Login submission, as JSON or as an HTML form.

use axum::extract::{Form, FromRequest, Request};
use axum::http::header;
use axum::Json;
use serde::Deserialize;

use wardgate_core::error::AppError;

use crate::error::ApiError;

/// `{identifier, password, next?}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
    /// Where to send a browser after a successful login.
    pub next: Option<String>,
}

impl<S> FromRequest<S> for LoginPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));

        if is_json {
            let Json(payload) = Json::<LoginPayload>::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(format!("Malformed login body: {e}")))?;
            Ok(payload)
        } else {
            let Form(payload) = Form::<LoginPayload>::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(format!("Malformed login form: {e}")))?;
            Ok(payload)
        }
    }
}
