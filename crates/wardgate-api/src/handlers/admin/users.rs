//! Bulk user handler.

use axum::Json;
use axum::extract::State;

use crate::dto::request::BulkUsersRequest;
use crate::error::ApiError;
use crate::extractors::Caller;
use crate::state::AppState;

/// POST <admin>/users/bulk
pub async fn bulk_users(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<BulkUsersRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let action = req.action()?;
    let outcome = state
        .services
        .identity
        .bulk(&caller.context(), action, &req.ids)
        .await?;
    Ok(Json(serde_json::json!({ "success": true, "data": outcome })))
}
