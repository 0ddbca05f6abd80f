//! Effective permission resolution.
//!
//! `effective(U) = direct(U) ∪ transitive(r) for each role r of U`, where
//! `transitive(r)` adds the permissions of every ancestor of `r`. Results
//! are cached per user; mutations call one of the `*_changed` hooks.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use wardgate_core::config::{CacheStrategy, RbacConfig};
use wardgate_core::result::AppResult;
use wardgate_core::types::{RoleId, UserId};
use wardgate_database::store::{PermissionStore, RoleStore, UserStore};
use wardgate_entity::user::User;

use super::cache::{PermissionCache, PermissionSet};
use super::graph::RoleGraph;

/// Computes and caches effective permission sets.
#[derive(Clone)]
pub struct PermissionResolver {
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
    permissions: Arc<dyn PermissionStore>,
    cache: Arc<PermissionCache>,
    strategy: CacheStrategy,
    max_depth: usize,
}

impl PermissionResolver {
    pub fn new(
        users: Arc<dyn UserStore>,
        roles: Arc<dyn RoleStore>,
        permissions: Arc<dyn PermissionStore>,
        config: &RbacConfig,
    ) -> Self {
        Self {
            users,
            roles,
            permissions,
            cache: Arc::new(PermissionCache::new()),
            strategy: config.cache_strategy,
            max_depth: config.max_depth,
        }
    }

    pub fn cache(&self) -> &PermissionCache {
        &self.cache
    }

    /// Snapshot of the current role graph.
    pub async fn graph(&self) -> AppResult<RoleGraph> {
        Ok(RoleGraph::from_roles(&self.roles.list().await?))
    }

    /// The user's effective permission set (qualified codenames).
    ///
    /// Superusers get no special treatment here; see [`has_permission`].
    ///
    /// [`has_permission`]: Self::has_permission
    pub async fn effective(&self, user_id: UserId) -> AppResult<PermissionSet> {
        if let Some(hit) = self.cache.get(user_id) {
            return Ok(hit);
        }
        let ticket = self.cache.ticket(user_id);
        let perms = Arc::new(self.compute(user_id).await?);
        if !self.cache.store(user_id, ticket, perms.clone()) {
            debug!(user_id = %user_id, "Discarded permission set computed during invalidation");
        }
        Ok(perms)
    }

    async fn compute(&self, user_id: UserId) -> AppResult<HashSet<String>> {
        let direct = self.users.direct_permission_ids(user_id).await?;
        let held = self.users.role_ids(user_id).await?;

        let mut permission_ids = direct;
        if !held.is_empty() {
            let graph = self.graph().await?;
            let mut closure: HashSet<RoleId> = HashSet::new();
            for role in held {
                closure.extend(graph.lineage(role, self.max_depth + 1));
            }
            let closure: Vec<RoleId> = closure.into_iter().collect();
            permission_ids.extend(self.roles.permission_ids_for_roles(&closure).await?);
        }
        permission_ids.sort();
        permission_ids.dedup();

        Ok(self
            .permissions
            .find_many(&permission_ids)
            .await?
            .iter()
            .map(|p| p.qualified())
            .collect())
    }

    /// Whether `user` holds `codename`. Inactive users hold nothing and
    /// active superusers hold everything.
    pub async fn has_permission(&self, user: &User, codename: &str) -> AppResult<bool> {
        if !user.is_active {
            return Ok(false);
        }
        if user.is_superuser {
            return Ok(true);
        }
        Ok(self.effective(user.id).await?.contains(codename))
    }

    /// A user's roles, direct grants, or active flag changed.
    pub fn user_changed(&self, user_id: UserId) {
        match self.strategy {
            CacheStrategy::Walk => self.cache.invalidate(user_id),
            CacheStrategy::Flush => self.cache.flush(),
        }
    }

    /// Drop the entries of specific users.
    pub fn users_changed(&self, user_ids: &[UserId]) {
        match self.strategy {
            CacheStrategy::Walk => user_ids.iter().for_each(|u| self.cache.invalidate(*u)),
            CacheStrategy::Flush => self.cache.flush(),
        }
    }

    /// A role's permissions or parent changed: every holder of the role or
    /// of any role inheriting from it is affected.
    pub async fn role_changed(&self, role: RoleId) -> AppResult<()> {
        match self.strategy {
            CacheStrategy::Flush => {
                self.cache.flush();
                Ok(())
            }
            CacheStrategy::Walk => {
                let affected = self.graph().await?.descendants(role);
                let holders = match self.users.users_with_any_role(&affected).await {
                    Ok(holders) => holders,
                    Err(e) => {
                        // Without the holder list the only safe move is a flush.
                        self.cache.flush();
                        return Err(e);
                    }
                };
                debug!(
                    role_id = %role,
                    roles = affected.len(),
                    users = holders.len(),
                    "Invalidating permission cache for role change"
                );
                self.users_changed(&holders);
                Ok(())
            }
        }
    }
}
