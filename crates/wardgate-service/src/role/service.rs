//! Role service: the role manager plus an audit trail.

use serde_json::json;

use wardgate_activity::AuditWriter;
use wardgate_auth::rbac::RoleManager;
use wardgate_core::result::AppResult;
use wardgate_core::types::{RoleId, UserId};
use wardgate_entity::audit::AuditAction;
use wardgate_entity::role::{NewRole, Role, RoleChanges};

use crate::context::RequestContext;

/// Role mutations, each followed by an audit entry.
#[derive(Clone)]
pub struct RoleService {
    roles: RoleManager,
    audit: AuditWriter,
}

impl RoleService {
    pub fn new(roles: RoleManager, audit: AuditWriter) -> Self {
        Self { roles, audit }
    }

    pub fn manager(&self) -> &RoleManager {
        &self.roles
    }

    pub async fn list(&self) -> AppResult<Vec<Role>> {
        self.roles.list().await
    }

    pub async fn find_by_name(&self, name: &str) -> AppResult<Role> {
        self.roles.find_by_name(name).await
    }

    pub async fn create(&self, ctx: &RequestContext, new: NewRole) -> AppResult<Role> {
        let role = self.roles.create(new).await?;
        self.record(
            ctx,
            AuditAction::Create,
            None,
            json!({ "role_id": role.id, "name": role.name }),
        )
        .await;
        Ok(role)
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: RoleId,
        changes: RoleChanges,
    ) -> AppResult<Role> {
        let role = self.roles.update(id, changes.clone()).await?;
        self.record(
            ctx,
            AuditAction::Update,
            None,
            json!({ "role_id": id, "changes": changes }),
        )
        .await;
        Ok(role)
    }

    pub async fn set_parent(
        &self,
        ctx: &RequestContext,
        id: RoleId,
        parent: Option<RoleId>,
    ) -> AppResult<Role> {
        let role = self.roles.set_parent(id, parent).await?;
        self.record(
            ctx,
            AuditAction::Update,
            None,
            json!({ "role_id": id, "parent_id": parent }),
        )
        .await;
        Ok(role)
    }

    pub async fn delete(&self, ctx: &RequestContext, id: RoleId) -> AppResult<Vec<UserId>> {
        let holders = self.roles.delete(id).await?;
        self.record(
            ctx,
            AuditAction::Delete,
            None,
            json!({ "role_id": id, "unassigned_users": holders }),
        )
        .await;
        Ok(holders)
    }

    pub async fn add_permission(
        &self,
        ctx: &RequestContext,
        id: RoleId,
        codename: &str,
    ) -> AppResult<bool> {
        let added = self.roles.add_permission(id, codename).await?;
        self.record(
            ctx,
            AuditAction::Update,
            None,
            json!({ "role_id": id, "permission_added": codename }),
        )
        .await;
        Ok(added)
    }

    pub async fn remove_permission(
        &self,
        ctx: &RequestContext,
        id: RoleId,
        codename: &str,
    ) -> AppResult<bool> {
        let removed = self.roles.remove_permission(id, codename).await?;
        self.record(
            ctx,
            AuditAction::Update,
            None,
            json!({ "role_id": id, "permission_removed": codename }),
        )
        .await;
        Ok(removed)
    }

    /// Give `user` the role named `role_name` (case-insensitive).
    pub async fn grant_role(
        &self,
        ctx: &RequestContext,
        user: UserId,
        role_name: &str,
    ) -> AppResult<bool> {
        let role = self.roles.find_by_name(role_name).await?;
        let added = self.roles.assign_role(user, role.id).await?;
        self.record(
            ctx,
            AuditAction::PrivilegeChange,
            Some(user),
            json!({ "role_id": role.id, "role": role.name, "granted": true }),
        )
        .await;
        Ok(added)
    }

    pub async fn revoke_role(
        &self,
        ctx: &RequestContext,
        user: UserId,
        role_name: &str,
    ) -> AppResult<bool> {
        let role = self.roles.find_by_name(role_name).await?;
        let removed = self.roles.revoke_role(user, role.id).await?;
        self.record(
            ctx,
            AuditAction::PrivilegeChange,
            Some(user),
            json!({ "role_id": role.id, "role": role.name, "granted": false }),
        )
        .await;
        Ok(removed)
    }

    pub async fn grant_permission(
        &self,
        ctx: &RequestContext,
        user: UserId,
        codename: &str,
    ) -> AppResult<()> {
        self.roles.grant_permission(user, codename).await?;
        self.record(
            ctx,
            AuditAction::PrivilegeChange,
            Some(user),
            json!({ "permission": codename, "granted": true }),
        )
        .await;
        Ok(())
    }

    pub async fn revoke_permission(
        &self,
        ctx: &RequestContext,
        user: UserId,
        codename: &str,
    ) -> AppResult<bool> {
        let removed = self.roles.revoke_permission(user, codename).await?;
        self.record(
            ctx,
            AuditAction::PrivilegeChange,
            Some(user),
            json!({ "permission": codename, "granted": false }),
        )
        .await;
        Ok(removed)
    }

    async fn record(
        &self,
        ctx: &RequestContext,
        action: AuditAction,
        target: Option<UserId>,
        mut details: serde_json::Value,
    ) {
        details["operator"] = ctx.operator();
        self.audit
            .audit(ctx.actor_id, action, target, details, ctx.ip())
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use wardgate_core::error::ErrorKind;
    use wardgate_core::types::PageRequest;
    use wardgate_database::store::{AuditFilter, AuditStore};

    fn role(name: &str) -> NewRole {
        NewRole {
            name: name.to_string(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_inherited_permission_follows_grants() {
        let f = Fixture::new();
        f.services.ensure_core_permissions().await.unwrap();
        let nurse = f.user("nurse", "0712").await;
        let ctx = RequestContext::system();
        let roles = &f.services.roles;

        let staff = roles.create(&ctx, role("Staff")).await.unwrap();
        let senior = roles.create(&ctx, role("Senior Nurse")).await.unwrap();
        roles.set_parent(&ctx, senior.id, Some(staff.id)).await.unwrap();
        roles
            .add_permission(&ctx, staff.id, "activity.view_activity")
            .await
            .unwrap();

        let resolver = &f.services.resolver;
        assert!(!resolver.has_permission(&nurse, "activity.view_activity").await.unwrap());

        assert!(roles.grant_role(&ctx, nurse.id, "SENIOR NURSE").await.unwrap());
        assert!(resolver.has_permission(&nurse, "activity.view_activity").await.unwrap());

        assert!(roles.revoke_role(&ctx, nurse.id, "senior nurse").await.unwrap());
        assert!(!resolver.has_permission(&nurse, "activity.view_activity").await.unwrap());
    }

    #[tokio::test]
    async fn test_cycle_is_rejected() {
        let f = Fixture::new();
        let ctx = RequestContext::system();
        let roles = &f.services.roles;
        let a = roles.create(&ctx, role("A")).await.unwrap();
        let b = roles.create(&ctx, role("B")).await.unwrap();
        roles.set_parent(&ctx, b.id, Some(a.id)).await.unwrap();

        let err = roles.set_parent(&ctx, a.id, Some(b.id)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_grant_unknown_role_is_not_found() {
        let f = Fixture::new();
        let nurse = f.user("nurse", "0712").await;
        let err = f
            .services
            .roles
            .grant_role(&RequestContext::system(), nurse.id, "Nope")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_mutations_are_audited_with_operator() {
        let f = Fixture::new();
        let admin = f.superuser("admin", "0700").await;
        let nurse = f.user("nurse", "0712").await;
        let ctx = RequestContext::for_user(&admin);
        f.services.roles.create(&ctx, role("Triage")).await.unwrap();
        f.services.roles.grant_role(&ctx, nurse.id, "triage").await.unwrap();

        let entries = AuditStore::list(
            &*f.memory,
            &AuditFilter {
                actor_id: Some(admin.id),
                ..Default::default()
            },
            &PageRequest::default(),
        )
        .await
        .unwrap();
        assert_eq!(entries.total_items, 2);
        let grant = &entries.items[0];
        assert_eq!(grant.action, AuditAction::PrivilegeChange);
        assert_eq!(grant.target_user_id, Some(nurse.id));
        assert_eq!(grant.details["role"], "Triage");
        assert_eq!(grant.details["operator"]["username"], "admin");
    }
}
