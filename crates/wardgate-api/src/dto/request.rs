//! Request DTOs and query strings.

use serde::Deserialize;

use wardgate_core::error::AppError;
use wardgate_core::result::AppResult;
use wardgate_core::types::{RoleId, UserId};
use wardgate_database::store::{AlertFilter, AuditFilter};
use wardgate_service::BulkAction;

/// `POST /auth/logout/?reason=`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogoutQuery {
    pub reason: Option<String>,
}

/// `GET <admin>/alerts/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertQuery {
    #[serde(default)]
    pub open: bool,
    pub severity: Option<String>,
    pub kind: Option<String>,
    pub user_id: Option<UserId>,
}

impl AlertQuery {
    pub fn filter(&self) -> AppResult<AlertFilter> {
        Ok(AlertFilter {
            open_only: self.open,
            severity: self.severity.as_deref().map(str::parse).transpose()?,
            kind: self.kind.as_deref().map(str::parse).transpose()?,
            user_id: self.user_id,
        })
    }
}

/// `GET <admin>/audit/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub actor_id: Option<UserId>,
    pub target_user_id: Option<UserId>,
    pub action: Option<String>,
}

impl AuditQuery {
    pub fn filter(&self) -> AppResult<AuditFilter> {
        Ok(AuditFilter {
            actor_id: self.actor_id,
            target_user_id: self.target_user_id,
            action: self.action.as_deref().map(str::parse).transpose()?,
        })
    }
}

/// `GET <admin>/activity/statistics?range=7d`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatisticsQuery {
    pub range: Option<String>,
}

/// `POST <admin>/alerts/{id}/resolve`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolveAlertRequest {
    #[serde(default)]
    pub notes: String,
}

/// `POST <admin>/users/bulk`.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkUsersRequest {
    pub action: String,
    pub role_id: Option<RoleId>,
    pub ids: Vec<UserId>,
}

impl BulkUsersRequest {
    pub fn action(&self) -> AppResult<BulkAction> {
        let role = || {
            self.role_id
                .ok_or_else(|| AppError::validation(format!("'{}' requires role_id", self.action)))
        };
        match self.action.as_str() {
            "activate" => Ok(BulkAction::Activate),
            "deactivate" => Ok(BulkAction::Deactivate),
            "delete" => Ok(BulkAction::Delete),
            "assign_role" => Ok(BulkAction::AssignRole(role()?)),
            "remove_role" => Ok(BulkAction::RemoveRole(role()?)),
            other => Err(AppError::validation(format!(
                "Unknown bulk action '{other}'. Expected one of: activate, deactivate, delete, assign_role, remove_role"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardgate_entity::activity::AlertSeverity;

    #[test]
    fn test_alert_query_filter() {
        let query = AlertQuery {
            open: true,
            severity: Some("critical".to_string()),
            ..Default::default()
        };
        let filter = query.filter().unwrap();
        assert!(filter.open_only);
        assert_eq!(filter.severity, Some(AlertSeverity::Critical));

        let bad = AlertQuery {
            severity: Some("loud".to_string()),
            ..Default::default()
        };
        assert!(bad.filter().is_err());
    }

    #[test]
    fn test_bulk_action_parsing() {
        let request: BulkUsersRequest =
            serde_json::from_str(r#"{"action":"assign_role","role_id":3,"ids":[1,2]}"#).unwrap();
        assert_eq!(request.action().unwrap(), BulkAction::AssignRole(RoleId(3)));

        let missing: BulkUsersRequest =
            serde_json::from_str(r#"{"action":"remove_role","ids":[1]}"#).unwrap();
        assert!(missing.action().is_err());

        let unknown: BulkUsersRequest =
            serde_json::from_str(r#"{"action":"purge","ids":[1]}"#).unwrap();
        assert!(unknown.action().is_err());
    }
}
