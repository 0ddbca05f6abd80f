//! Activity alert repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use wardgate_core::error::{AppError, ErrorKind};
use wardgate_core::result::AppResult;
use wardgate_core::types::{AlertId, PageRequest, PageResponse, UserId};
use wardgate_entity::activity::{ActivityAlert, NewAlert};

use crate::store::activity::{AlertFilter, AlertStore};

/// Repository for anomaly alerts.
#[derive(Debug, Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    /// Create a new alert repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const FILTER_CLAUSE: &str = "WHERE (NOT $1 OR NOT is_resolved) \
       AND ($2::alert_severity IS NULL OR severity = $2) \
       AND ($3::alert_kind IS NULL OR alert_kind = $3) \
       AND ($4::BIGINT IS NULL OR user_id = $4)";

#[async_trait]
impl AlertStore for AlertRepository {
    async fn insert(&self, alert: NewAlert) -> AppResult<ActivityAlert> {
        sqlx::query_as::<_, ActivityAlert>(
            "INSERT INTO activity_alerts (user_id, alert_kind, severity, message, ip_address, \
                                          metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(alert.user_id)
        .bind(alert.alert_kind)
        .bind(alert.severity)
        .bind(&alert.message)
        .bind(&alert.ip_address)
        .bind(&alert.metadata)
        .bind(alert.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert alert", e))
    }

    async fn find(&self, id: AlertId) -> AppResult<Option<ActivityAlert>> {
        sqlx::query_as::<_, ActivityAlert>("SELECT * FROM activity_alerts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find alert", e))
    }

    async fn list(
        &self,
        filter: &AlertFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ActivityAlert>> {
        let count_sql = format!("SELECT COUNT(*) FROM activity_alerts {FILTER_CLAUSE}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.open_only)
            .bind(filter.severity)
            .bind(filter.kind)
            .bind(filter.user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count alerts", e))?;

        let select_sql = format!(
            "SELECT * FROM activity_alerts {FILTER_CLAUSE} \
             ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6"
        );
        let items = sqlx::query_as::<_, ActivityAlert>(&select_sql)
            .bind(filter.open_only)
            .bind(filter.severity)
            .bind(filter.kind)
            .bind(filter.user_id)
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list alerts", e))?;

        Ok(PageResponse::new(items, page, total as u64))
    }

    async fn resolve(
        &self,
        id: AlertId,
        resolved_by: Option<UserId>,
        notes: &str,
        at: DateTime<Utc>,
    ) -> AppResult<ActivityAlert> {
        let updated = sqlx::query_as::<_, ActivityAlert>(
            "UPDATE activity_alerts \
             SET is_resolved = TRUE, resolved_by = $2, resolved_at = $3, resolution_notes = $4 \
             WHERE id = $1 AND NOT is_resolved RETURNING *",
        )
        .bind(id)
        .bind(resolved_by)
        .bind(at)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to resolve alert", e))?;

        match updated {
            Some(alert) => Ok(alert),
            None => match self.find(id).await? {
                Some(_) => Err(AppError::conflict(format!("Alert {id} is already resolved"))),
                None => Err(AppError::not_found(format!("Alert {id} not found"))),
            },
        }
    }

    async fn count_open(&self) -> AppResult<u64> {
        let n: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM activity_alerts WHERE NOT is_resolved")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count open alerts", e)
                })?;
        Ok(n as u64)
    }
}
