//! Session store trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use wardgate_core::result::AppResult;
use wardgate_core::types::UserId;
use wardgate_entity::session::Session;

/// Persistent sessions, addressed only by token hash.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &Session) -> AppResult<()>;

    async fn find(&self, token_hash: &str) -> AppResult<Option<Session>>;

    /// Advance `last_activity` (never backwards) and set `expiry`.
    /// Returns `false` when the session no longer exists.
    async fn touch(
        &self,
        token_hash: &str,
        last_activity: DateTime<Utc>,
        expiry: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Delete one session, returning it if it existed.
    async fn delete(&self, token_hash: &str) -> AppResult<Option<Session>>;

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Session>>;

    /// Delete every session of a user, returning the removed rows.
    async fn delete_for_user(&self, user_id: UserId) -> AppResult<Vec<Session>>;

    /// Delete every session whose expiry is before `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<Vec<Session>>;
}
