//! Activity record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use wardgate_core::types::{ActivityId, UserId};

/// Maximum stored description length, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

text_enum! {
    /// What kind of action an activity record describes.
    ActionKind as "action_kind" {
        Login => "login",
        Logout => "logout",
        View => "view",
        Create => "create",
        Update => "update",
        Delete => "delete",
        Export => "export",
        Search => "search",
        Download => "download",
        Print => "print",
        Authorize => "authorize",
        AccessDenied => "access_denied",
        Error => "error",
        Other => "other",
    }
}

text_enum! {
    /// Risk level of an activity, ordered from least to most severe.
    #[derive(PartialOrd, Ord)]
    ActivityLevel as "activity_level" {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

impl ActivityLevel {
    /// The next level up, saturating at `Critical`.
    pub fn raised(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High | Self::Critical => Self::Critical,
        }
    }
}

/// One immutable row of the activity stream.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityRecord {
    /// Unique record identifier.
    pub id: ActivityId,
    /// Acting user; `None` for anonymous requests and unresolved logins.
    pub user_id: Option<UserId>,
    /// Classified action.
    pub action_kind: ActionKind,
    /// Classified risk level.
    pub level: ActivityLevel,
    /// Human-readable summary.
    pub description: String,
    /// Module tag derived from the first path segment.
    pub module: String,
    /// Target object type, if one could be derived.
    pub object_type: Option<String>,
    /// Target object id.
    pub object_id: Option<String>,
    /// Target object representation.
    pub object_repr: Option<String>,
    /// Client IP.
    pub ip_address: Option<String>,
    /// Client User-Agent.
    pub user_agent: Option<String>,
    /// Hash of the session token the request carried.
    pub session_ref: Option<String>,
    /// HTTP method.
    pub method: Option<String>,
    /// Request path.
    pub path: Option<String>,
    /// Response status code.
    pub response_status: Option<i32>,
    /// Handler latency.
    pub response_time_ms: Option<i64>,
    /// Structured extra data.
    pub extra: serde_json::Value,
    /// When the handler completed.
    pub created_at: DateTime<Utc>,
}

/// Data required to append an activity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivityRecord {
    pub user_id: Option<UserId>,
    pub action_kind: ActionKind,
    pub level: ActivityLevel,
    pub description: String,
    pub module: String,
    pub object_type: Option<String>,
    pub object_id: Option<String>,
    pub object_repr: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub session_ref: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
    pub response_status: Option<i32>,
    pub response_time_ms: Option<i64>,
    pub extra: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl NewActivityRecord {
    /// A record with the mandatory fields set and everything else empty.
    ///
    /// The description is truncated to [`MAX_DESCRIPTION_CHARS`].
    pub fn new(
        action_kind: ActionKind,
        level: ActivityLevel,
        description: impl Into<String>,
        module: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: None,
            action_kind,
            level,
            description: truncate_chars(description.into(), MAX_DESCRIPTION_CHARS),
            module: module.into(),
            object_type: None,
            object_id: None,
            object_repr: None,
            ip_address: None,
            user_agent: None,
            session_ref: None,
            method: None,
            path: None,
            response_status: None,
            response_time_ms: None,
            extra: serde_json::Value::Object(Default::default()),
            created_at,
        }
    }

    /// Attach the acting user.
    pub fn with_user(mut self, user_id: Option<UserId>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Attach client details.
    pub fn with_client(mut self, ip: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip;
        self.user_agent = user_agent;
        self
    }

    /// Attach the session reference.
    pub fn with_session(mut self, session_ref: Option<String>) -> Self {
        self.session_ref = session_ref;
        self
    }

    /// Attach structured extra data.
    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = extra;
        self
    }

    /// Turn the pending record into a stored row.
    pub fn into_record(self, id: ActivityId) -> ActivityRecord {
        ActivityRecord {
            id,
            user_id: self.user_id,
            action_kind: self.action_kind,
            level: self.level,
            description: self.description,
            module: self.module,
            object_type: self.object_type,
            object_id: self.object_id,
            object_repr: self.object_repr,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            session_ref: self.session_ref,
            method: self.method,
            path: self.path,
            response_status: self.response_status,
            response_time_ms: self.response_time_ms,
            extra: self.extra,
            created_at: self.created_at,
        }
    }
}

fn truncate_chars(value: String, max: usize) -> String {
    if value.chars().count() <= max {
        value
    } else {
        value.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering_and_raise() {
        assert!(ActivityLevel::Low < ActivityLevel::Critical);
        assert_eq!(ActivityLevel::Low.raised(), ActivityLevel::Medium);
        assert_eq!(ActivityLevel::Critical.raised(), ActivityLevel::Critical);
    }

    #[test]
    fn test_description_truncated() {
        let long = "x".repeat(800);
        let record = NewActivityRecord::new(
            ActionKind::View,
            ActivityLevel::Low,
            long,
            "Patients",
            Utc::now(),
        );
        assert_eq!(record.description.chars().count(), MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn test_action_kind_wire_names() {
        assert_eq!(ActionKind::AccessDenied.as_str(), "access_denied");
        assert_eq!("access-denied".parse::<ActionKind>().unwrap(), ActionKind::AccessDenied);
        let json = serde_json::to_string(&ActionKind::AccessDenied).unwrap();
        assert_eq!(json, "\"access_denied\"");
    }
}
