//! Audit log handler.

use axum::Json;
use axum::extract::{Query, State};

use crate::dto::request::AuditQuery;
use crate::error::ApiError;
use crate::extractors::PaginationParams;
use crate::state::AppState;

/// GET <admin>/audit/
pub async fn list_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let filter = query.filter()?;
    let result = state
        .services
        .audit
        .list(&filter, &params.page_request())
        .await?;
    Ok(Json(serde_json::json!({ "success": true, "data": result })))
}
