//! Activity alert entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use wardgate_core::types::{AlertId, UserId};

text_enum! {
    /// Category of a raised alert.
    AlertKind as "alert_kind" {
        MultipleFailedLogins => "multiple_failed_logins",
        UnusualAccessTime => "unusual_access_time",
        SuspiciousIp => "suspicious_ip",
        PrivilegeEscalation => "privilege_escalation",
        BulkOperations => "bulk_operations",
        HighFrequencyRequests => "high_frequency_requests",
        UnauthorizedAccess => "unauthorized_access",
        SystemError => "system_error",
        Other => "other",
    }
}

text_enum! {
    /// Severity of a raised alert, ordered from least to most severe.
    #[derive(PartialOrd, Ord)]
    AlertSeverity as "alert_severity" {
        Info => "info",
        Warning => "warning",
        Error => "error",
        Critical => "critical",
    }
}

/// An alert produced by the anomaly detector.
///
/// Alerts are created open and transition to resolved exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityAlert {
    /// Unique alert identifier.
    pub id: AlertId,
    /// Subject user, when one is known.
    pub user_id: Option<UserId>,
    /// Rule that fired.
    pub alert_kind: AlertKind,
    /// Severity.
    pub severity: AlertSeverity,
    /// Operator-facing message.
    pub message: String,
    /// IP address involved.
    pub ip_address: Option<String>,
    /// Rule-specific structured data.
    pub metadata: serde_json::Value,
    /// Set once the alert has been handled.
    pub is_resolved: bool,
    /// Operator who resolved the alert.
    pub resolved_by: Option<UserId>,
    /// When the alert was resolved.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Resolution notes.
    pub resolution_notes: Option<String>,
    /// When the alert was raised.
    pub created_at: DateTime<Utc>,
}

/// Data required to raise an alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlert {
    pub user_id: Option<UserId>,
    pub alert_kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub ip_address: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl NewAlert {
    /// Turn the pending alert into an open stored row.
    pub fn into_alert(self, id: AlertId) -> ActivityAlert {
        ActivityAlert {
            id,
            user_id: self.user_id,
            alert_kind: self.alert_kind,
            severity: self.severity,
            message: self.message,
            ip_address: self.ip_address,
            metadata: self.metadata,
            is_resolved: false,
            resolved_by: None,
            resolved_at: None,
            resolution_notes: None,
            created_at: self.created_at,
        }
    }
}
