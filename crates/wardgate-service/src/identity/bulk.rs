//! Bulk user actions.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use wardgate_core::error::AppError;
use wardgate_core::result::AppResult;
use wardgate_core::types::{RoleId, UserId};
use wardgate_database::store::UserCascade;
use wardgate_entity::audit::AuditAction;

use super::service::IdentityService;
use crate::context::RequestContext;

/// One action applied to many users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "role_id", rename_all = "snake_case")]
pub enum BulkAction {
    Activate,
    Deactivate,
    AssignRole(RoleId),
    RemoveRole(RoleId),
    Delete,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::AssignRole(_) => "assign_role",
            Self::RemoveRole(_) => "remove_role",
            Self::Delete => "delete",
        }
    }

    fn role(&self) -> Option<RoleId> {
        match self {
            Self::AssignRole(role) | Self::RemoveRole(role) => Some(*role),
            _ => None,
        }
    }
}

/// What a bulk action did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub affected_ids: Vec<UserId>,
    /// Missing users, protected users, and users already in the target state.
    pub skipped_ids: Vec<UserId>,
    /// Users the action could not be applied to.
    pub failed: Vec<BulkFailure>,
    /// Rows removed alongside deleted users.
    pub cascade: UserCascade,
}

/// A user a bulk action failed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFailure {
    pub user_id: UserId,
    pub error: String,
}

impl IdentityService {
    /// Apply `action` to every user in `ids`.
    ///
    /// Delete never removes a superuser or the actor. A store failure on
    /// one user is reported in [`BulkOutcome::failed`] and the remaining
    /// users are still processed, so the audit entry always describes
    /// what actually changed.
    pub async fn bulk(
        &self,
        ctx: &RequestContext,
        action: BulkAction,
        ids: &[UserId],
    ) -> AppResult<BulkOutcome> {
        if ids.is_empty() {
            return Err(AppError::validation("No users selected"));
        }
        if let Some(role) = action.role() {
            if !self.roles.list().await?.iter().any(|r| r.id == role) {
                return Err(AppError::not_found(format!("Role {role} not found")));
            }
        }

        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();

        let mut outcome = BulkOutcome::default();
        for id in ids {
            match self.apply(ctx, action, id, &mut outcome.cascade).await {
                Ok(true) => outcome.affected_ids.push(id),
                Ok(false) => outcome.skipped_ids.push(id),
                Err(e) => {
                    warn!(
                        action = action.as_str(),
                        user_id = %id,
                        error = %e,
                        "Bulk action failed for user"
                    );
                    outcome.failed.push(BulkFailure {
                        user_id: id,
                        error: e.message.clone(),
                    });
                }
            }
        }

        info!(
            action = action.as_str(),
            affected = outcome.affected_ids.len(),
            skipped = outcome.skipped_ids.len(),
            failed = outcome.failed.len(),
            "Bulk user action applied"
        );
        let entry = self.audit
            .audit(
                ctx.actor_id,
                AuditAction::BulkAction,
                None,
                json!({
                    "action": action.as_str(),
                    "role_id": action.role(),
                    "affected_ids": outcome.affected_ids,
                    "skipped_ids": outcome.skipped_ids,
                    "failed": outcome.failed,
                    "cascade": outcome.cascade,
                    "operator": ctx.operator(),
                }),
                ctx.ip(),
            )
            .await;
        self.detector
            .observe_bulk_operation(
                entry.map(|e| format!("audit:{}", e.id)).as_deref(),
                ctx.actor_id,
                &format!("users.{}", action.as_str()),
                outcome.affected_ids.len() as u64,
                ctx.ip(),
            )
            .await;
        Ok(outcome)
    }

    async fn apply(
        &self,
        ctx: &RequestContext,
        action: BulkAction,
        id: UserId,
        cascade: &mut UserCascade,
    ) -> AppResult<bool> {
        let Some(user) = self.users.find(id).await? else {
            return Ok(false);
        };
        let is_actor = ctx.actor_id == Some(id);

        match action {
            BulkAction::Activate => {
                if user.is_active {
                    return Ok(false);
                }
                self.users.set_active(id, true).await?;
                self.resolver.user_changed(id);
            }
            BulkAction::Deactivate => {
                if !user.is_active || is_actor {
                    return Ok(false);
                }
                self.users.set_active(id, false).await?;
                self.resolver.user_changed(id);
                self.end_sessions(ctx, id).await?;
            }
            BulkAction::AssignRole(role) => {
                return self.roles.assign_role(id, role).await;
            }
            BulkAction::RemoveRole(role) => {
                return self.roles.revoke_role(id, role).await;
            }
            BulkAction::Delete => {
                if user.is_superuser || is_actor {
                    return Ok(false);
                }
                let removed = self.users.delete(id).await?;
                self.resolver.user_changed(id);
                cascade.accumulate(&removed);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use wardgate_core::error::ErrorKind;
    use wardgate_core::types::PageRequest;
    use wardgate_database::store::{AlertFilter, AlertStore, AuditFilter, AuditStore, UserStore};
    use wardgate_entity::activity::AlertKind;
    use wardgate_entity::role::NewRole;

    #[tokio::test]
    async fn test_bulk_delete_skips_superuser_and_actor() {
        let f = Fixture::new();
        let admin = f.superuser("admin", "0700").await;
        let operator = f.user("operator", "0701").await;
        let a = f.user("a", "0702").await;
        let b = f.user("b", "0703").await;
        let ctx = RequestContext::for_user(&operator);

        let outcome = f
            .services
            .identity
            .bulk(
                &ctx,
                BulkAction::Delete,
                &[admin.id, operator.id, a.id, b.id, UserId(999)],
            )
            .await
            .unwrap();

        assert_eq!(outcome.affected_ids, vec![a.id, b.id]);
        assert_eq!(outcome.skipped_ids, vec![admin.id, operator.id, UserId(999)]);
        assert!(UserStore::find(&*f.memory, a.id).await.unwrap().is_none());
        assert!(UserStore::find(&*f.memory, admin.id).await.unwrap().is_some());

        let entries = AuditStore::list(
            &*f.memory,
            &AuditFilter {
                action: Some(AuditAction::BulkAction),
                ..Default::default()
            },
            &PageRequest::default(),
        )
        .await
        .unwrap();
        assert_eq!(entries.total_items, 1);
        let details = &entries.items[0].details;
        assert_eq!(details["action"], "delete");
        assert_eq!(details["operator"]["username"], "operator");
        assert_eq!(entries.items[0].actor_id, Some(operator.id));
    }

    #[tokio::test]
    async fn test_bulk_rejects_empty_and_unknown_role() {
        let f = Fixture::new();
        let user = f.user("a", "0702").await;
        let ctx = RequestContext::system();

        let err = f
            .services
            .identity
            .bulk(&ctx, BulkAction::Activate, &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = f
            .services
            .identity
            .bulk(&ctx, BulkAction::AssignRole(RoleId(42)), &[user.id])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_bulk_assign_role_skips_holders() {
        let f = Fixture::new();
        let a = f.user("a", "0702").await;
        let b = f.user("b", "0703").await;
        let ctx = RequestContext::system();
        let role = f
            .services
            .roles
            .create(
                &ctx,
                NewRole {
                    name: "Triage".to_string(),
                    description: String::new(),
                },
            )
            .await
            .unwrap();
        f.services.roles.grant_role(&ctx, a.id, "triage").await.unwrap();

        let outcome = f
            .services
            .identity
            .bulk(&ctx, BulkAction::AssignRole(role.id), &[a.id, b.id])
            .await
            .unwrap();
        assert_eq!(outcome.affected_ids, vec![b.id]);
        assert_eq!(outcome.skipped_ids, vec![a.id]);
    }

    #[tokio::test]
    async fn test_bulk_deactivate_past_threshold_raises_alert() {
        let mut config = wardgate_core::config::AppConfig::default();
        config.detector.bulk_operation_threshold = 2;
        let f = Fixture::with_config(config);
        let operator = f.user("operator", "0701").await;
        let mut ids = Vec::new();
        for i in 0..3 {
            ids.push(f.user(&format!("u{i}"), &format!("080{i}")).await.id);
        }
        ids.push(operator.id);

        let outcome = f
            .services
            .identity
            .bulk(&RequestContext::for_user(&operator), BulkAction::Deactivate, &ids)
            .await
            .unwrap();
        assert_eq!(outcome.affected_ids.len(), 3);
        assert_eq!(outcome.skipped_ids, vec![operator.id]);

        let alerts = AlertStore::list(
            &*f.memory,
            &AlertFilter {
                kind: Some(AlertKind::BulkOperations),
                ..Default::default()
            },
            &PageRequest::default(),
        )
        .await
        .unwrap();
        assert_eq!(alerts.total_items, 1);
        assert_eq!(alerts.items[0].user_id, Some(operator.id));
    }

    #[tokio::test]
    async fn test_bulk_store_failure_is_reported_and_audited() {
        let f = Fixture::new();
        let a = f.user("a", "0702").await;
        let b = f.user("b", "0703").await;
        let c = f.user("c", "0704").await;
        f.memory.set_failing_user(Some(b.id));

        let outcome = f
            .services
            .identity
            .bulk(&RequestContext::system(), BulkAction::Deactivate, &[a.id, b.id, c.id])
            .await
            .unwrap();
        assert_eq!(outcome.affected_ids, vec![a.id, c.id]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].user_id, b.id);

        assert!(!UserStore::find(&*f.memory, a.id).await.unwrap().unwrap().is_active);
        assert!(UserStore::find(&*f.memory, b.id).await.unwrap().unwrap().is_active);
        assert!(!UserStore::find(&*f.memory, c.id).await.unwrap().unwrap().is_active);

        let entries = AuditStore::list(
            &*f.memory,
            &AuditFilter {
                action: Some(AuditAction::BulkAction),
                ..Default::default()
            },
            &PageRequest::default(),
        )
        .await
        .unwrap();
        assert_eq!(entries.total_items, 1);
        let details = &entries.items[0].details;
        assert_eq!(details["affected_ids"], serde_json::json!([a.id.get(), c.id.get()]));
        assert_eq!(details["failed"][0]["user_id"], serde_json::json!(b.id.get()));
    }
}
