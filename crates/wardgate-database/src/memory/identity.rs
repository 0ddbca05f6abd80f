//! In-memory identity stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use wardgate_core::error::AppError;
use wardgate_core::result::AppResult;
use wardgate_core::types::{PermissionId, RoleId, UserId};
use wardgate_entity::permission::{NewPermission, Permission};
use wardgate_entity::role::{MAX_ROLE_NAME_LEN, NewRole, Role, RoleChanges};
use wardgate_entity::user::{NewUser, User, UserChanges, UserProfile};

use super::{MemoryState, MemoryStore, next};
use crate::store::identity::{PermissionStore, RoleStore, UserCascade, UserStore};

impl MemoryState {
    fn check_user_unique(
        &self,
        skip: Option<UserId>,
        username: &str,
        phone: &str,
        email: Option<&str>,
    ) -> AppResult<()> {
        for user in self.users.values().filter(|u| Some(u.id) != skip) {
            if user.username == username {
                return Err(AppError::conflict(format!(
                    "Username '{username}' already exists"
                )));
            }
            if user.phone == phone {
                return Err(AppError::conflict(format!("Phone '{phone}' already exists")));
            }
            if email.is_some() && user.email.as_deref() == email {
                return Err(AppError::conflict("Email already in use"));
            }
        }
        Ok(())
    }

    fn user_mut(&mut self, id: UserId) -> AppResult<&mut User> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))
    }

    fn role_mut(&mut self, id: RoleId) -> AppResult<&mut Role> {
        self.roles
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Role {id} not found")))
    }

    fn role_name_taken(&self, name: &str, skip: Option<RoleId>) -> bool {
        self.roles
            .values()
            .any(|r| Some(r.id) != skip && same_role_name(&r.name, name))
    }
}

/// Case-insensitive role name comparison, folding like `LOWER()`.
fn same_role_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// The `roles.name` column width.
fn check_role_name_width(name: &str) -> AppResult<()> {
    if name.chars().count() > MAX_ROLE_NAME_LEN {
        return Err(AppError::database(format!(
            "Role name exceeds {MAX_ROLE_NAME_LEN} characters"
        )));
    }
    Ok(())
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, new: &NewUser) -> AppResult<User> {
        self.enter().await;
        let mut state = self.state.write().await;
        state.check_user_unique(None, &new.username, &new.phone, new.email.as_deref())?;

        let id = UserId(next(&mut state.seq.user));
        let user = User {
            id,
            username: new.username.clone(),
            phone: new.phone.clone(),
            email: new.email.clone(),
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            password_hash: new.password_hash.clone(),
            is_active: new.is_active,
            is_staff: new.is_staff,
            is_superuser: new.is_superuser,
            created_at: Utc::now(),
            last_login: None,
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find(&self, id: UserId) -> AppResult<Option<User>> {
        self.enter().await;
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[UserId]) -> AppResult<Vec<User>> {
        self.enter().await;
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.enter().await;
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<User>> {
        self.enter().await;
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.phone == phone).cloned())
    }

    async fn update_fields(&self, id: UserId, changes: &UserChanges) -> AppResult<User> {
        self.enter().await;
        let mut state = self.state.write().await;
        if let Some(Some(email)) = &changes.email {
            let (username, phone) = {
                let user = state.user_mut(id)?;
                (user.username.clone(), user.phone.clone())
            };
            state.check_user_unique(Some(id), &username, &phone, Some(email))?;
        }

        let user = state.user_mut(id)?;
        if let Some(first) = &changes.first_name {
            user.first_name = first.clone();
        }
        if let Some(last) = &changes.last_name {
            user.last_name = last.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        Ok(user.clone())
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> AppResult<()> {
        self.enter().await;
        let mut state = self.state.write().await;
        state.user_mut(id)?.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn set_active(&self, id: UserId, is_active: bool) -> AppResult<User> {
        self.enter().await;
        self.user_write(id)?;
        let mut state = self.state.write().await;
        let user = state.user_mut(id)?;
        user.is_active = is_active;
        Ok(user.clone())
    }

    async fn set_flags(&self, id: UserId, is_staff: bool, is_superuser: bool) -> AppResult<User> {
        self.enter().await;
        if is_superuser && !is_staff {
            return Err(AppError::validation("A superuser must also be staff"));
        }
        let mut state = self.state.write().await;
        let user = state.user_mut(id)?;
        user.is_staff = is_staff;
        user.is_superuser = is_superuser;
        Ok(user.clone())
    }

    async fn touch_last_login(&self, id: UserId, at: DateTime<Utc>) -> AppResult<()> {
        self.enter().await;
        let mut state = self.state.write().await;
        state.user_mut(id)?.last_login = Some(at);
        Ok(())
    }

    async fn delete(&self, id: UserId) -> AppResult<UserCascade> {
        self.enter().await;
        self.user_write(id)?;
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Err(AppError::not_found(format!("User {id} not found")));
        }

        let roles_before = state.user_roles.len();
        state.user_roles.retain(|(u, _)| *u != id);
        let perms_before = state.user_permissions.len();
        state.user_permissions.retain(|(u, _)| *u != id);
        let sessions_before = state.sessions.len();
        state.sessions.retain(|_, s| s.user_id != id);
        let profiles = u64::from(state.profiles.remove(&id).is_some());

        for record in state.activities.iter_mut().filter(|r| r.user_id == Some(id)) {
            record.user_id = None;
        }
        for entry in state.audit.iter_mut() {
            if entry.actor_id == Some(id) {
                entry.actor_id = None;
            }
            if entry.target_user_id == Some(id) {
                entry.target_user_id = None;
            }
        }

        Ok(UserCascade {
            role_assignments: (roles_before - state.user_roles.len()) as u64,
            direct_permissions: (perms_before - state.user_permissions.len()) as u64,
            sessions: (sessions_before - state.sessions.len()) as u64,
            profiles,
        })
    }

    async fn profile(&self, id: UserId, now: DateTime<Utc>) -> AppResult<UserProfile> {
        self.enter().await;
        let mut state = self.state.write().await;
        if !state.users.contains_key(&id) {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        Ok(state
            .profiles
            .entry(id)
            .or_insert_with(|| UserProfile::empty(id, now))
            .clone())
    }

    async fn role_ids(&self, id: UserId) -> AppResult<Vec<RoleId>> {
        self.enter().await;
        let state = self.state.read().await;
        Ok(state
            .user_roles
            .iter()
            .filter(|(u, _)| *u == id)
            .map(|(_, r)| *r)
            .collect())
    }

    async fn assign_role(&self, id: UserId, role: RoleId) -> AppResult<bool> {
        self.enter().await;
        let mut state = self.state.write().await;
        if !state.users.contains_key(&id) {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        if !state.roles.contains_key(&role) {
            return Err(AppError::not_found(format!("Role {role} not found")));
        }
        Ok(state.user_roles.insert((id, role)))
    }

    async fn revoke_role(&self, id: UserId, role: RoleId) -> AppResult<bool> {
        self.enter().await;
        Ok(self.state.write().await.user_roles.remove(&(id, role)))
    }

    async fn clear_roles(&self, id: UserId) -> AppResult<u64> {
        self.enter().await;
        let mut state = self.state.write().await;
        let before = state.user_roles.len();
        state.user_roles.retain(|(u, _)| *u != id);
        Ok((before - state.user_roles.len()) as u64)
    }

    async fn users_with_any_role(&self, roles: &[RoleId]) -> AppResult<Vec<UserId>> {
        self.enter().await;
        let state = self.state.read().await;
        let mut users: Vec<UserId> = state
            .user_roles
            .iter()
            .filter(|(_, r)| roles.contains(r))
            .map(|(u, _)| *u)
            .collect();
        users.dedup();
        Ok(users)
    }

    async fn direct_permission_ids(&self, id: UserId) -> AppResult<Vec<PermissionId>> {
        self.enter().await;
        let state = self.state.read().await;
        Ok(state
            .user_permissions
            .iter()
            .filter(|(u, _)| *u == id)
            .map(|(_, p)| *p)
            .collect())
    }

    async fn grant_permission(&self, id: UserId, permission: PermissionId) -> AppResult<bool> {
        self.enter().await;
        let mut state = self.state.write().await;
        if !state.users.contains_key(&id) {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        if !state.permissions.contains_key(&permission) {
            return Err(AppError::not_found(format!("Permission {permission} not found")));
        }
        Ok(state.user_permissions.insert((id, permission)))
    }

    async fn revoke_permission(&self, id: UserId, permission: PermissionId) -> AppResult<bool> {
        self.enter().await;
        Ok(self
            .state
            .write()
            .await
            .user_permissions
            .remove(&(id, permission)))
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn insert(&self, new: &NewRole) -> AppResult<Role> {
        self.enter().await;
        check_role_name_width(&new.name)?;
        let mut state = self.state.write().await;
        if state.role_name_taken(&new.name, None) {
            return Err(AppError::conflict(format!("Role '{}' already exists", new.name)));
        }
        let id = RoleId(next(&mut state.seq.role));
        let role = Role {
            id,
            name: new.name.clone(),
            description: new.description.clone(),
            parent_id: None,
            created_at: Utc::now(),
        };
        state.roles.insert(id, role.clone());
        Ok(role)
    }

    async fn find(&self, id: RoleId) -> AppResult<Option<Role>> {
        self.enter().await;
        Ok(self.state.read().await.roles.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        self.enter().await;
        let state = self.state.read().await;
        Ok(state
            .roles
            .values()
            .find(|r| same_role_name(&r.name, name))
            .cloned())
    }

    async fn list(&self) -> AppResult<Vec<Role>> {
        self.enter().await;
        Ok(self.state.read().await.roles.values().cloned().collect())
    }

    async fn update(&self, id: RoleId, changes: &RoleChanges) -> AppResult<Role> {
        self.enter().await;
        let mut state = self.state.write().await;
        if let Some(name) = &changes.name {
            check_role_name_width(name)?;
            if state.role_name_taken(name, Some(id)) {
                return Err(AppError::conflict(format!("Role '{name}' already exists")));
            }
        }
        let role = state.role_mut(id)?;
        if let Some(name) = &changes.name {
            role.name = name.clone();
        }
        if let Some(description) = &changes.description {
            role.description = description.clone();
        }
        Ok(role.clone())
    }

    async fn set_parent(&self, id: RoleId, parent: Option<RoleId>) -> AppResult<Role> {
        self.enter().await;
        let mut state = self.state.write().await;
        if let Some(parent) = parent {
            if parent == id {
                return Err(AppError::validation("A role cannot be its own parent"));
            }
            if !state.roles.contains_key(&parent) {
                return Err(AppError::not_found(format!("Role {parent} not found")));
            }
        }
        let role = state.role_mut(id)?;
        role.parent_id = parent;
        Ok(role.clone())
    }

    async fn delete(&self, id: RoleId) -> AppResult<u64> {
        self.enter().await;
        let mut state = self.state.write().await;
        if !state.roles.contains_key(&id) {
            return Err(AppError::not_found(format!("Role {id} not found")));
        }
        if state.roles.values().any(|r| r.parent_id == Some(id)) {
            return Err(AppError::conflict(format!(
                "Role {id} still has child roles; reassign them first"
            )));
        }
        state.roles.remove(&id);
        state.role_permissions.retain(|(r, _)| *r != id);
        let before = state.user_roles.len();
        state.user_roles.retain(|(_, r)| *r != id);
        Ok((before - state.user_roles.len()) as u64)
    }

    async fn permission_ids(&self, id: RoleId) -> AppResult<Vec<PermissionId>> {
        self.enter().await;
        let state = self.state.read().await;
        Ok(state
            .role_permissions
            .iter()
            .filter(|(r, _)| *r == id)
            .map(|(_, p)| *p)
            .collect())
    }

    async fn permission_ids_for_roles(&self, roles: &[RoleId]) -> AppResult<Vec<PermissionId>> {
        self.enter().await;
        let state = self.state.read().await;
        let mut ids: Vec<PermissionId> = state
            .role_permissions
            .iter()
            .filter(|(r, _)| roles.contains(r))
            .map(|(_, p)| *p)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn add_permission(&self, id: RoleId, permission: PermissionId) -> AppResult<bool> {
        self.enter().await;
        let mut state = self.state.write().await;
        if !state.roles.contains_key(&id) {
            return Err(AppError::not_found(format!("Role {id} not found")));
        }
        if !state.permissions.contains_key(&permission) {
            return Err(AppError::not_found(format!("Permission {permission} not found")));
        }
        Ok(state.role_permissions.insert((id, permission)))
    }

    async fn remove_permission(&self, id: RoleId, permission: PermissionId) -> AppResult<bool> {
        self.enter().await;
        Ok(self
            .state
            .write()
            .await
            .role_permissions
            .remove(&(id, permission)))
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn insert(&self, new: &NewPermission) -> AppResult<Permission> {
        self.enter().await;
        let mut state = self.state.write().await;
        let exists = state
            .permissions
            .values()
            .any(|p| p.object_type == new.object_type && p.codename == new.codename);
        if exists {
            return Err(AppError::conflict(format!(
                "Permission '{}.{}' already exists",
                new.object_type, new.codename
            )));
        }
        let id = PermissionId(next(&mut state.seq.permission));
        let permission = Permission {
            id,
            object_type: new.object_type.clone(),
            codename: new.codename.clone(),
            name: new.name.clone(),
        };
        state.permissions.insert(id, permission.clone());
        Ok(permission)
    }

    async fn find_by_codename(
        &self,
        object_type: &str,
        codename: &str,
    ) -> AppResult<Option<Permission>> {
        self.enter().await;
        let state = self.state.read().await;
        Ok(state
            .permissions
            .values()
            .find(|p| p.object_type == object_type && p.codename == codename)
            .cloned())
    }

    async fn find_many(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>> {
        self.enter().await;
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.permissions.get(id).cloned())
            .collect())
    }

    async fn list(&self) -> AppResult<Vec<Permission>> {
        self.enter().await;
        Ok(self.state.read().await.permissions.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, phone: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            phone: phone.to_string(),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "hash".to_string(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }

    #[tokio::test]
    async fn test_user_uniqueness() {
        let store = MemoryStore::new();
        UserStore::insert(&store, &new_user("alice", "0801")).await.unwrap();

        let dup_name = UserStore::insert(&store, &new_user("alice", "0802")).await;
        assert_eq!(dup_name.unwrap_err().kind, wardgate_core::ErrorKind::Conflict);

        let dup_phone = UserStore::insert(&store, &new_user("bob", "0801")).await;
        assert_eq!(dup_phone.unwrap_err().kind, wardgate_core::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_role_name_case_insensitive() {
        let store = MemoryStore::new();
        let doctor = NewRole {
            name: "Doctor".to_string(),
            description: String::new(),
        };
        RoleStore::insert(&store, &doctor).await.unwrap();

        let found = store.find_by_name("doctor").await.unwrap();
        assert!(found.is_some());

        let dup = NewRole {
            name: "DOCTOR".to_string(),
            description: String::new(),
        };
        assert!(RoleStore::insert(&store, &dup).await.is_err());
    }

    #[tokio::test]
    async fn test_role_name_folds_unicode_case() {
        let store = MemoryStore::new();
        let role = NewRole {
            name: "Ärztliche Leitung".to_string(),
            description: String::new(),
        };
        RoleStore::insert(&store, &role).await.unwrap();

        assert!(store.find_by_name("ärztliche leitung").await.unwrap().is_some());
        let dup = NewRole {
            name: "ÄRZTLICHE LEITUNG".to_string(),
            description: String::new(),
        };
        let err = RoleStore::insert(&store, &dup).await.unwrap_err();
        assert_eq!(err.kind, wardgate_core::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_role_name_column_width() {
        let store = MemoryStore::new();
        let widest = NewRole {
            name: "w".repeat(MAX_ROLE_NAME_LEN),
            description: String::new(),
        };
        assert!(RoleStore::insert(&store, &widest).await.is_ok());

        let too_wide = NewRole {
            name: "x".repeat(MAX_ROLE_NAME_LEN + 1),
            description: String::new(),
        };
        assert!(RoleStore::insert(&store, &too_wide).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_user_reports_cascade() {
        let store = MemoryStore::new();
        let user = UserStore::insert(&store, &new_user("carol", "0803")).await.unwrap();
        let role = RoleStore::insert(
            &store,
            &NewRole {
                name: "nurse".to_string(),
                description: String::new(),
            },
        )
        .await
        .unwrap();
        store.assign_role(user.id, role.id).await.unwrap();
        store.profile(user.id, Utc::now()).await.unwrap();

        let cascade = UserStore::delete(&store, user.id).await.unwrap();
        assert_eq!(cascade.role_assignments, 1);
        assert_eq!(cascade.profiles, 1);
        assert_eq!(cascade.sessions, 0);
        assert!(UserStore::find(&store, user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_role_delete_restricted_by_children() {
        let store = MemoryStore::new();
        let parent = RoleStore::insert(
            &store,
            &NewRole {
                name: "doctor".to_string(),
                description: String::new(),
            },
        )
        .await
        .unwrap();
        let child = RoleStore::insert(
            &store,
            &NewRole {
                name: "senior_doctor".to_string(),
                description: String::new(),
            },
        )
        .await
        .unwrap();
        store.set_parent(child.id, Some(parent.id)).await.unwrap();

        let err = RoleStore::delete(&store, parent.id).await.unwrap_err();
        assert_eq!(err.kind, wardgate_core::ErrorKind::Conflict);
    }
}
