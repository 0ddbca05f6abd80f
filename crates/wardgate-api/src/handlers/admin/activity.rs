//! Activity statistics handler.

use axum::Json;
use axum::extract::{Query, State};

use wardgate_entity::activity::StatsRange;

use crate::dto::request::StatisticsQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// GET <admin>/activity/statistics?range=7d
pub async fn statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let range = match query.range.as_deref() {
        Some(raw) => raw.parse::<StatsRange>()?,
        None => StatsRange::default(),
    };
    let stats = state.services.recorder.statistics(range).await?;
    Ok(Json(serde_json::json!({ "success": true, "data": stats })))
}
