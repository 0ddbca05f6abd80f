//! Activity stream and session summary repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use wardgate_core::error::{AppError, ErrorKind};
use wardgate_core::result::AppResult;
use wardgate_core::types::{PageRequest, PageResponse, UserId};
use wardgate_entity::activity::{
    ActivityRecord, ActivityStatistics, NewActivityRecord, SessionSummary, SummaryTouch,
    UserActivityCount,
};
use wardgate_entity::session::EndReason;

use crate::store::activity::{ActivityFilter, ActivityStore};

/// Repository for activity records and session summaries.
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    /// Create a new activity repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const FILTER_CLAUSE: &str = "WHERE ($1::BIGINT IS NULL OR user_id = $1) \
       AND ($2::TEXT IS NULL OR session_ref = $2) \
       AND ($3::activity_level IS NULL OR level >= $3) \
       AND ($4::TIMESTAMPTZ IS NULL OR created_at >= $4)";

#[async_trait]
impl ActivityStore for ActivityRepository {
    async fn append(&self, record: NewActivityRecord) -> AppResult<ActivityRecord> {
        sqlx::query_as::<_, ActivityRecord>(
            "INSERT INTO activity_records (user_id, action_kind, level, description, module, \
                 object_type, object_id, object_repr, ip_address, user_agent, session_ref, \
                 method, path, response_status, response_time_ms, extra, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING *",
        )
        .bind(record.user_id)
        .bind(record.action_kind)
        .bind(record.level)
        .bind(&record.description)
        .bind(&record.module)
        .bind(&record.object_type)
        .bind(&record.object_id)
        .bind(&record.object_repr)
        .bind(&record.ip_address)
        .bind(&record.user_agent)
        .bind(&record.session_ref)
        .bind(&record.method)
        .bind(&record.path)
        .bind(record.response_status)
        .bind(record.response_time_ms)
        .bind(&record.extra)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to append activity", e))
    }

    async fn list(
        &self,
        filter: &ActivityFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ActivityRecord>> {
        let count_sql = format!("SELECT COUNT(*) FROM activity_records {FILTER_CLAUSE}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.user_id)
            .bind(&filter.session_ref)
            .bind(filter.min_level)
            .bind(filter.since)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count activities", e)
            })?;

        let select_sql = format!(
            "SELECT * FROM activity_records {FILTER_CLAUSE} \
             ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6"
        );
        let items = sqlx::query_as::<_, ActivityRecord>(&select_sql)
            .bind(filter.user_id)
            .bind(&filter.session_ref)
            .bind(filter.min_level)
            .bind(filter.since)
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list activities", e)
            })?;

        Ok(PageResponse::new(items, page, total as u64))
    }

    async fn touch_summary(&self, touch: &SummaryTouch) -> AppResult<SessionSummary> {
        sqlx::query_as::<_, SessionSummary>(
            "INSERT INTO session_summaries AS s (session_ref, user_id, ip_address, user_agent, \
                 created_at, last_activity, is_active, page_views, total_requests, \
                 avg_response_time_ms) \
             VALUES ($1, $2, $3, $4, $5, $5, TRUE, CASE WHEN $6 THEN 1 ELSE 0 END, 1, \
                     COALESCE($7, 0)::DOUBLE PRECISION) \
             ON CONFLICT (session_ref) DO UPDATE SET \
                 avg_response_time_ms = CASE WHEN $7 IS NULL THEN s.avg_response_time_ms \
                     ELSE (s.avg_response_time_ms * s.total_requests + $7) / (s.total_requests + 1) \
                 END, \
                 total_requests = s.total_requests + 1, \
                 page_views = s.page_views + CASE WHEN $6 THEN 1 ELSE 0 END, \
                 last_activity = GREATEST(s.last_activity, $5), \
                 user_id = COALESCE(s.user_id, $2) \
             RETURNING *",
        )
        .bind(&touch.session_ref)
        .bind(touch.user_id)
        .bind(&touch.ip_address)
        .bind(&touch.user_agent)
        .bind(touch.at)
        .bind(touch.page_view)
        .bind(touch.response_time_ms)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update session summary", e)
        })
    }

    async fn close_summary(
        &self,
        session_ref: &str,
        at: DateTime<Utc>,
        reason: EndReason,
    ) -> AppResult<Option<SessionSummary>> {
        sqlx::query(
            "UPDATE session_summaries SET is_active = FALSE, ended_at = $2, end_reason = $3 \
             WHERE session_ref = $1 AND is_active",
        )
        .bind(session_ref)
        .bind(at)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to close session summary", e)
        })?;
        self.find_summary(session_ref).await
    }

    async fn find_summary(&self, session_ref: &str) -> AppResult<Option<SessionSummary>> {
        sqlx::query_as::<_, SessionSummary>(
            "SELECT * FROM session_summaries WHERE session_ref = $1",
        )
        .bind(session_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find session summary", e)
        })
    }

    async fn statistics(&self, since: DateTime<Utc>) -> AppResult<ActivityStatistics> {
        let (total, errors): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE action_kind = 'error') \
             FROM activity_records WHERE created_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count activities", e))?;

        let by_level: Vec<(String, i64)> = sqlx::query_as(
            "SELECT level::TEXT, COUNT(*) FROM activity_records \
             WHERE created_at >= $1 GROUP BY level",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to group activities by level", e)
        })?;

        let by_module: Vec<(String, i64)> = sqlx::query_as(
            "SELECT module, COUNT(*) FROM activity_records \
             WHERE created_at >= $1 GROUP BY module",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to group activities by module", e)
        })?;

        let top_users: Vec<(UserId, i64)> = sqlx::query_as(
            "SELECT user_id, COUNT(*) AS n FROM activity_records \
             WHERE created_at >= $1 AND user_id IS NOT NULL \
             GROUP BY user_id ORDER BY n DESC, user_id LIMIT 10",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to rank users", e))?;

        Ok(ActivityStatistics {
            since: Some(since),
            total: total as u64,
            errors: errors as u64,
            by_level: by_level.into_iter().map(|(k, n)| (k, n as u64)).collect(),
            by_module: by_module.into_iter().map(|(k, n)| (k, n as u64)).collect(),
            top_users: top_users
                .into_iter()
                .map(|(user_id, count)| UserActivityCount {
                    user_id,
                    count: count as u64,
                })
                .collect(),
            open_alerts: 0,
        })
    }
}
