//! Audit log entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use wardgate_core::types::{AuditLogId, UserId};

text_enum! {
    /// Privileged mutation recorded in the audit log.
    AuditAction as "audit_action" {
        Create => "create",
        Update => "update",
        Deactivate => "deactivate",
        Delete => "delete",
        PrivilegeChange => "privilege_change",
        DashboardView => "dashboard_view",
        BulkAction => "bulk_action",
    }
}

/// An append-only audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLogEntry {
    /// Unique audit entry identifier.
    pub id: AuditLogId,
    /// Operator; `None` means the system itself.
    pub actor_id: Option<UserId>,
    /// Affected user, if any.
    pub target_user_id: Option<UserId>,
    /// Action performed.
    pub action: AuditAction,
    /// Structured details.
    pub details: serde_json::Value,
    /// Operator IP.
    pub ip_address: Option<String>,
    /// When the action occurred.
    pub created_at: DateTime<Utc>,
}

/// Data required to append an audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub actor_id: Option<UserId>,
    pub target_user_id: Option<UserId>,
    pub action: AuditAction,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewAuditEntry {
    /// Turn the pending entry into a stored row.
    pub fn into_entry(self, id: AuditLogId) -> AuditLogEntry {
        AuditLogEntry {
            id,
            actor_id: self.actor_id,
            target_user_id: self.target_user_id,
            action: self.action,
            details: self.details,
            ip_address: self.ip_address,
            created_at: self.created_at,
        }
    }
}
