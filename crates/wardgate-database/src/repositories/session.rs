//! Session repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use wardgate_core::error::{AppError, ErrorKind};
use wardgate_core::result::AppResult;
use wardgate_core::types::UserId;
use wardgate_entity::session::Session;

use crate::store::session::SessionStore;

/// Repository for authenticated sessions.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn insert(&self, session: &Session) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, created_at, last_activity, expiry, \
                                   ip_address, user_agent_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&session.token_hash)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.last_activity)
        .bind(session.expiry)
        .bind(&session.ip_address)
        .bind(&session.user_agent_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::not_found(format!("User {} not found", session.user_id))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create session", e),
        })?;
        Ok(())
    }

    async fn find(&self, token_hash: &str) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find session", e))
    }

    async fn touch(
        &self,
        token_hash: &str,
        last_activity: DateTime<Utc>,
        expiry: DateTime<Utc>,
    ) -> AppResult<bool> {
        // Concurrent resolutions race; the later instant wins.
        let result = sqlx::query(
            "UPDATE sessions \
             SET expiry = CASE WHEN $2 >= last_activity THEN $3 ELSE expiry END, \
                 last_activity = GREATEST(last_activity, $2) \
             WHERE token_hash = $1",
        )
        .bind(token_hash)
        .bind(last_activity)
        .bind(expiry)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to touch session", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, token_hash: &str) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("DELETE FROM sessions WHERE token_hash = $1 RETURNING *")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete session", e))
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list sessions", e))
    }

    async fn delete_for_user(&self, user_id: UserId) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>("DELETE FROM sessions WHERE user_id = $1 RETURNING *")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete user sessions", e)
            })
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>("DELETE FROM sessions WHERE expiry < $1 RETURNING *")
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete expired sessions", e)
            })
    }
}
