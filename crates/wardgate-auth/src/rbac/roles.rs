//! Role lifecycle with graph invariants and cache invalidation.
//!
//! Mutations on one role hold that role's lock. Parent changes also hold
//! the topology lock, since a cycle check reads every role's link and two
//! concurrent re-parentings could otherwise close a cycle between them.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use wardgate_core::config::RbacConfig;
use wardgate_core::error::AppError;
use wardgate_core::result::AppResult;
use wardgate_core::types::{PermissionId, RoleId, UserId};
use wardgate_database::store::{PermissionStore, RoleStore, UserStore};
use wardgate_entity::permission::{Permission, split_codename};
use wardgate_entity::role::{MAX_ROLE_NAME_LEN, NewRole, Role, RoleChanges};

use super::graph::RoleGraph;
use super::resolver::PermissionResolver;

/// Serialized mutations of roles, assignments, and grants.
#[derive(Clone)]
pub struct RoleManager {
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
    permissions: Arc<dyn PermissionStore>,
    resolver: PermissionResolver,
    locks: Arc<DashMap<RoleId, Arc<Mutex<()>>>>,
    topology: Arc<Mutex<()>>,
    max_depth: usize,
}

impl RoleManager {
    pub fn new(
        users: Arc<dyn UserStore>,
        roles: Arc<dyn RoleStore>,
        permissions: Arc<dyn PermissionStore>,
        resolver: PermissionResolver,
        config: &RbacConfig,
    ) -> Self {
        Self {
            users,
            roles,
            permissions,
            resolver,
            locks: Arc::new(DashMap::new()),
            topology: Arc::new(Mutex::new(())),
            max_depth: config.max_depth,
        }
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    async fn lock(&self, role: RoleId) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(role)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    async fn require(&self, role: RoleId) -> AppResult<Role> {
        self.roles
            .find(role)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Role {role} not found")))
    }

    /// Case-insensitive lookup by name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Role> {
        self.roles
            .find_by_name(name)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Role '{name}' not found")))
    }

    pub async fn list(&self) -> AppResult<Vec<Role>> {
        self.roles.list().await
    }

    /// Resolve a qualified codename to its permission row.
    pub async fn permission(&self, qualified: &str) -> AppResult<Permission> {
        let (object_type, codename) = split_codename(qualified)?;
        self.permissions
            .find_by_codename(object_type, codename)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Permission '{qualified}' not found")))
    }

    pub async fn create(&self, new: NewRole) -> AppResult<Role> {
        let name = validate_name(&new.name)?;
        let role = self
            .roles
            .insert(&NewRole {
                name,
                description: new.description,
            })
            .await?;
        info!(role_id = %role.id, name = %role.name, "Role created");
        Ok(role)
    }

    /// Rename or re-describe a role. Permissions are unaffected, so the
    /// cache is left alone.
    pub async fn update(&self, role: RoleId, changes: RoleChanges) -> AppResult<Role> {
        let _guard = self.lock(role).await;
        let changes = RoleChanges {
            name: changes.name.as_deref().map(validate_name).transpose()?,
            description: changes.description,
        };
        self.roles.update(role, &changes).await
    }

    /// Point `role` at a new parent, or detach it with `None`.
    pub async fn set_parent(&self, role: RoleId, parent: Option<RoleId>) -> AppResult<Role> {
        let _topology = self.topology.lock().await;
        let _guard = self.lock(role).await;

        if let Some(parent) = parent {
            let graph = RoleGraph::from_roles(&self.roles.list().await?);
            graph.check_parent(role, parent, self.max_depth)?;
        } else {
            self.require(role).await?;
        }

        let updated = self.roles.set_parent(role, parent).await?;
        self.resolver.role_changed(role).await?;
        info!(
            role_id = %role,
            parent_id = ?parent.map(|p| p.get()),
            "Role parent changed"
        );
        Ok(updated)
    }

    /// Delete a role. Fails with a conflict while other roles inherit
    /// from it. Returns the users who held it.
    pub async fn delete(&self, role: RoleId) -> AppResult<Vec<UserId>> {
        let _topology = self.topology.lock().await;
        let _guard = self.lock(role).await;

        let holders = self.users.users_with_any_role(&[role]).await?;
        self.roles.delete(role).await?;
        self.locks.remove(&role);
        self.resolver.users_changed(&holders);
        info!(role_id = %role, holders = holders.len(), "Role deleted");
        Ok(holders)
    }

    /// Grant a permission to a role. Returns `false` when already granted.
    pub async fn add_permission(&self, role: RoleId, codename: &str) -> AppResult<bool> {
        let permission = self.permission(codename).await?;
        let _guard = self.lock(role).await;
        let added = self.roles.add_permission(role, permission.id).await?;
        self.resolver.role_changed(role).await?;
        Ok(added)
    }

    pub async fn remove_permission(&self, role: RoleId, codename: &str) -> AppResult<bool> {
        let permission = self.permission(codename).await?;
        let _guard = self.lock(role).await;
        let removed = self.roles.remove_permission(role, permission.id).await?;
        self.resolver.role_changed(role).await?;
        Ok(removed)
    }

    pub async fn assign_role(&self, user: UserId, role: RoleId) -> AppResult<bool> {
        let _guard = self.lock(role).await;
        let added = self.users.assign_role(user, role).await?;
        self.resolver.user_changed(user);
        Ok(added)
    }

    pub async fn revoke_role(&self, user: UserId, role: RoleId) -> AppResult<bool> {
        let _guard = self.lock(role).await;
        let removed = self.users.revoke_role(user, role).await?;
        self.resolver.user_changed(user);
        Ok(removed)
    }

    /// Grant a permission directly to a user.
    pub async fn grant_permission(&self, user: UserId, codename: &str) -> AppResult<PermissionId> {
        let permission = self.permission(codename).await?;
        self.users.grant_permission(user, permission.id).await?;
        self.resolver.user_changed(user);
        Ok(permission.id)
    }

    pub async fn revoke_permission(&self, user: UserId, codename: &str) -> AppResult<bool> {
        let permission = self.permission(codename).await?;
        let removed = self.users.revoke_permission(user, permission.id).await?;
        self.resolver.user_changed(user);
        Ok(removed)
    }
}

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Role name must not be empty"));
    }
    if name.chars().count() > MAX_ROLE_NAME_LEN {
        return Err(AppError::validation(format!(
            "Role name must be at most {MAX_ROLE_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardgate_core::error::ErrorKind;
    use wardgate_database::memory::MemoryStore;
    use wardgate_entity::permission::NewPermission;
    use wardgate_entity::user::{NewUser, User};

    fn manager(store: &Arc<MemoryStore>, max_depth: usize) -> RoleManager {
        let config = RbacConfig {
            max_depth,
            ..RbacConfig::default()
        };
        let resolver =
            PermissionResolver::new(store.clone(), store.clone(), store.clone(), &config);
        RoleManager::new(store.clone(), store.clone(), store.clone(), resolver, &config)
    }

    fn new_role(name: &str) -> NewRole {
        NewRole {
            name: name.to_string(),
            description: String::new(),
        }
    }

    async fn nurse(store: &MemoryStore) -> User {
        UserStore::insert(
            store,
            &NewUser {
                username: "nurse".to_string(),
                phone: "5550001".to_string(),
                email: None,
                first_name: String::new(),
                last_name: String::new(),
                password_hash: "x".to_string(),
                is_active: true,
                is_staff: false,
                is_superuser: false,
            },
        )
        .await
        .unwrap()
    }

    async fn register(store: &MemoryStore, object_type: &str, codename: &str) {
        PermissionStore::insert(
            store,
            &NewPermission {
                object_type: object_type.to_string(),
                codename: codename.to_string(),
                name: codename.to_string(),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_cycle_rejected() {
        let store = Arc::new(MemoryStore::new());
        let roles = manager(&store, 16);
        let a = roles.create(new_role("a")).await.unwrap();
        let b = roles.create(new_role("b")).await.unwrap();
        let c = roles.create(new_role("c")).await.unwrap();
        roles.set_parent(b.id, Some(a.id)).await.unwrap();
        roles.set_parent(c.id, Some(b.id)).await.unwrap();

        let err = roles.set_parent(a.id, Some(c.id)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        let err = roles.set_parent(a.id, Some(a.id)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        // The graph is unchanged.
        assert_eq!(roles.require(a.id).await.unwrap().parent_id, None);
    }

    #[tokio::test]
    async fn test_role_name_length_limit() {
        let store = Arc::new(MemoryStore::new());
        let roles = manager(&store, 16);
        let longest = "r".repeat(MAX_ROLE_NAME_LEN);
        assert!(roles.create(new_role(&longest)).await.is_ok());

        let too_long = "s".repeat(MAX_ROLE_NAME_LEN + 1);
        let err = roles.create(new_role(&too_long)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let store = Arc::new(MemoryStore::new());
        let roles = manager(&store, 2);
        let a = roles.create(new_role("a")).await.unwrap();
        let b = roles.create(new_role("b")).await.unwrap();
        let c = roles.create(new_role("c")).await.unwrap();
        let d = roles.create(new_role("d")).await.unwrap();
        roles.set_parent(b.id, Some(a.id)).await.unwrap();
        roles.set_parent(c.id, Some(b.id)).await.unwrap();
        let err = roles.set_parent(d.id, Some(c.id)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_assignment_invalidates_cache() {
        let store = Arc::new(MemoryStore::new());
        let roles = manager(&store, 16);
        register(&store, "patients", "view").await;
        let user = nurse(&store).await;
        let ward = roles.create(new_role("Ward")).await.unwrap();
        roles.add_permission(ward.id, "patients.view").await.unwrap();

        let resolver = roles.resolver();
        assert!(!resolver.has_permission(&user, "patients.view").await.unwrap());

        let by_name = roles.find_by_name("WARD").await.unwrap();
        assert!(roles.assign_role(user.id, by_name.id).await.unwrap());
        assert!(resolver.has_permission(&user, "patients.view").await.unwrap());

        let holders = roles.delete(ward.id).await.unwrap();
        assert_eq!(holders, vec![user.id]);
        assert!(!resolver.has_permission(&user, "patients.view").await.unwrap());
    }

    #[tokio::test]
    async fn test_direct_grant() {
        let store = Arc::new(MemoryStore::new());
        let roles = manager(&store, 16);
        register(&store, "reports", "export").await;
        let user = nurse(&store).await;

        roles.grant_permission(user.id, "reports.export").await.unwrap();
        assert!(roles.resolver().has_permission(&user, "reports.export").await.unwrap());
        assert!(roles.revoke_permission(user.id, "reports.export").await.unwrap());
        assert!(!roles.resolver().has_permission(&user, "reports.export").await.unwrap());

        let err = roles.grant_permission(user.id, "reports.missing").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_with_children_conflicts() {
        let store = Arc::new(MemoryStore::new());
        let roles = manager(&store, 16);
        let a = roles.create(new_role("a")).await.unwrap();
        let b = roles.create(new_role("b")).await.unwrap();
        roles.set_parent(b.id, Some(a.id)).await.unwrap();
        let err = roles.delete(a.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let store = Arc::new(MemoryStore::new());
        let roles = manager(&store, 16);
        let err = roles.create(new_role("  ")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
