//! Identity store traits: users, roles, permissions, and assignments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wardgate_core::result::AppResult;
use wardgate_core::types::{PermissionId, RoleId, UserId};
use wardgate_entity::permission::{NewPermission, Permission};
use wardgate_entity::role::{NewRole, Role, RoleChanges};
use wardgate_entity::user::{NewUser, User, UserChanges, UserProfile};

/// Rows removed alongside a deleted user, per dependent table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCascade {
    pub role_assignments: u64,
    pub direct_permissions: u64,
    pub sessions: u64,
    pub profiles: u64,
}

impl UserCascade {
    /// Add another cascade's counts into this one.
    pub fn accumulate(&mut self, other: &UserCascade) {
        self.role_assignments += other.role_assignments;
        self.direct_permissions += other.direct_permissions;
        self.sessions += other.sessions;
        self.profiles += other.profiles;
    }
}

/// Persistent users, their profiles, role assignments, and direct grants.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Duplicate username, phone, or email is a conflict.
    async fn insert(&self, new: &NewUser) -> AppResult<User>;

    async fn find(&self, id: UserId) -> AppResult<Option<User>>;

    async fn find_many(&self, ids: &[UserId]) -> AppResult<Vec<User>>;

    /// Exact username match.
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Exact phone match.
    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<User>>;

    async fn update_fields(&self, id: UserId, changes: &UserChanges) -> AppResult<User>;

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> AppResult<()>;

    async fn set_active(&self, id: UserId, is_active: bool) -> AppResult<User>;

    async fn set_flags(&self, id: UserId, is_staff: bool, is_superuser: bool) -> AppResult<User>;

    async fn touch_last_login(&self, id: UserId, at: DateTime<Utc>) -> AppResult<()>;

    /// Hard-delete a user and report what cascaded.
    async fn delete(&self, id: UserId) -> AppResult<UserCascade>;

    /// Return the profile, creating an empty one on first access.
    async fn profile(&self, id: UserId, now: DateTime<Utc>) -> AppResult<UserProfile>;

    async fn role_ids(&self, id: UserId) -> AppResult<Vec<RoleId>>;

    /// Returns `true` when the assignment did not exist before.
    async fn assign_role(&self, id: UserId, role: RoleId) -> AppResult<bool>;

    /// Returns `true` when an assignment was removed.
    async fn revoke_role(&self, id: UserId, role: RoleId) -> AppResult<bool>;

    async fn clear_roles(&self, id: UserId) -> AppResult<u64>;

    /// Users holding at least one of `roles`.
    async fn users_with_any_role(&self, roles: &[RoleId]) -> AppResult<Vec<UserId>>;

    async fn direct_permission_ids(&self, id: UserId) -> AppResult<Vec<PermissionId>>;

    async fn grant_permission(&self, id: UserId, permission: PermissionId) -> AppResult<bool>;

    async fn revoke_permission(&self, id: UserId, permission: PermissionId) -> AppResult<bool>;
}

/// Persistent roles, their parent links, and role-permission assignments.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Insert a role. A case-insensitive duplicate name is a conflict.
    async fn insert(&self, new: &NewRole) -> AppResult<Role>;

    async fn find(&self, id: RoleId) -> AppResult<Option<Role>>;

    /// Case-insensitive name lookup.
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>>;

    /// Every role, ordered by id.
    async fn list(&self) -> AppResult<Vec<Role>>;

    async fn update(&self, id: RoleId, changes: &RoleChanges) -> AppResult<Role>;

    /// Store the parent link. Graph invariants are checked by the caller.
    async fn set_parent(&self, id: RoleId, parent: Option<RoleId>) -> AppResult<Role>;

    /// Delete a role and its assignments, returning how many user
    /// assignments were removed. Fails with a conflict while child roles
    /// still point at it.
    async fn delete(&self, id: RoleId) -> AppResult<u64>;

    async fn permission_ids(&self, id: RoleId) -> AppResult<Vec<PermissionId>>;

    /// Distinct permissions held directly by any of `roles`.
    async fn permission_ids_for_roles(&self, roles: &[RoleId]) -> AppResult<Vec<PermissionId>>;

    async fn add_permission(&self, id: RoleId, permission: PermissionId) -> AppResult<bool>;

    async fn remove_permission(&self, id: RoleId, permission: PermissionId) -> AppResult<bool>;
}

/// Read access to the permission catalogue, plus registration for the
/// surrounding domain.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn insert(&self, new: &NewPermission) -> AppResult<Permission>;

    async fn find_by_codename(
        &self,
        object_type: &str,
        codename: &str,
    ) -> AppResult<Option<Permission>>;

    async fn find_many(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>>;

    async fn list(&self) -> AppResult<Vec<Permission>>;
}
