//! User profile satellite row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use wardgate_core::types::UserId;

/// One-to-one profile data, created lazily on first access.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    /// Owning user.
    pub user_id: UserId,
    /// Hospital department.
    pub department: Option<String>,
    /// Job title.
    pub title: Option<String>,
    /// Free-form biography.
    pub bio: Option<String>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// An empty profile for `user_id`.
    pub fn empty(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            department: None,
            title: None,
            bio: None,
            updated_at: now,
        }
    }
}
