//! Activity alert handlers.

use axum::Json;
use axum::extract::{Path, Query, State};

use wardgate_core::types::AlertId;

use crate::dto::request::{AlertQuery, ResolveAlertRequest};
use crate::error::ApiError;
use crate::extractors::{Caller, PaginationParams};
use crate::state::AppState;

/// GET <admin>/alerts/
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertQuery>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let filter = query.filter()?;
    let result = state
        .services
        .alerts
        .list(&filter, &params.page_request())
        .await?;
    Ok(Json(serde_json::json!({ "success": true, "data": result })))
}

/// POST <admin>/alerts/{id}/resolve
pub async fn resolve_alert(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<AlertId>,
    Json(req): Json<ResolveAlertRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let alert = state
        .services
        .alerts
        .resolve(&caller.context(), id, req.notes.trim())
        .await?;
    Ok(Json(serde_json::json!({ "success": true, "data": alert })))
}
