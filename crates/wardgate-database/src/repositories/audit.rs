//! Audit log repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use wardgate_core::error::{AppError, ErrorKind};
use wardgate_core::result::AppResult;
use wardgate_core::types::{PageRequest, PageResponse};
use wardgate_entity::audit::{AuditLogEntry, NewAuditEntry};

use crate::store::activity::{AuditFilter, AuditStore};

/// Repository for audit log entries.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

impl AuditLogRepository {
    /// Create a new audit log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const FILTER_CLAUSE: &str = "WHERE ($1::BIGINT IS NULL OR actor_id = $1) \
       AND ($2::BIGINT IS NULL OR target_user_id = $2) \
       AND ($3::audit_action IS NULL OR action = $3)";

#[async_trait]
impl AuditStore for AuditLogRepository {
    async fn append(&self, entry: NewAuditEntry) -> AppResult<AuditLogEntry> {
        sqlx::query_as::<_, AuditLogEntry>(
            "INSERT INTO audit_logs (actor_id, target_user_id, action, details, ip_address, \
                                     created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(entry.actor_id)
        .bind(entry.target_user_id)
        .bind(entry.action)
        .bind(&entry.details)
        .bind(&entry.ip_address)
        .bind(entry.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to append audit entry", e))
    }

    async fn list(
        &self,
        filter: &AuditFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<AuditLogEntry>> {
        let count_sql = format!("SELECT COUNT(*) FROM audit_logs {FILTER_CLAUSE}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.actor_id)
            .bind(filter.target_user_id)
            .bind(filter.action)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count audit entries", e)
            })?;

        let select_sql = format!(
            "SELECT * FROM audit_logs {FILTER_CLAUSE} \
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        );
        let items = sqlx::query_as::<_, AuditLogEntry>(&select_sql)
            .bind(filter.actor_id)
            .bind(filter.target_user_id)
            .bind(filter.action)
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list audit entries", e)
            })?;

        Ok(PageResponse::new(items, page, total as u64))
    }
}
