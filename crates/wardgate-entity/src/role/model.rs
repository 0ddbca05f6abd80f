//! Role entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use wardgate_core::types::RoleId;

/// Longest role name, in characters. Matches the `roles.name` column.
pub const MAX_ROLE_NAME_LEN: usize = 100;

/// A named bundle of permissions that may inherit from a parent role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Role {
    /// Unique role identifier.
    pub id: RoleId,
    /// Unique name; lookups are case-insensitive.
    pub name: String,
    /// Human description.
    pub description: String,
    /// Role this one inherits permissions from.
    pub parent_id: Option<RoleId>,
    /// When the role was created.
    pub created_at: DateTime<Utc>,
}

/// Data required to create a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRole {
    /// Role name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
}

/// Name/description changes. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleChanges {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
}
