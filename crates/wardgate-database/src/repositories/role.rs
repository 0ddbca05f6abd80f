//! Role repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use wardgate_core::error::{AppError, ErrorKind};
use wardgate_core::result::AppResult;
use wardgate_core::types::{PermissionId, RoleId};
use wardgate_entity::role::{NewRole, Role, RoleChanges};

use crate::store::identity::RoleStore;

/// Repository for roles and role-permission assignments.
#[derive(Debug, Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    /// Create a new role repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn role_write_error(e: sqlx::Error, name: &str, context: &str) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err)
            if db_err.constraint() == Some("roles_name_lower_key") =>
        {
            AppError::conflict(format!("Role '{name}' already exists"))
        }
        sqlx::Error::Database(ref db_err)
            if db_err.constraint() == Some("roles_not_self_parent") =>
        {
            AppError::validation("A role cannot be its own parent")
        }
        _ => AppError::with_source(ErrorKind::Database, context.to_string(), e),
    }
}

#[async_trait]
impl RoleStore for RoleRepository {
    async fn insert(&self, new: &NewRole) -> AppResult<Role> {
        sqlx::query_as::<_, Role>(
            "INSERT INTO roles (name, description) VALUES ($1, $2) RETURNING *",
        )
        .bind(&new.name)
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| role_write_error(e, &new.name, "Failed to create role"))
    }

    async fn find(&self, id: RoleId) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find role", e))
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find role by name", e)
            })
    }

    async fn list(&self) -> AppResult<Vec<Role>> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list roles", e))
    }

    async fn update(&self, id: RoleId, changes: &RoleChanges) -> AppResult<Role> {
        let name = changes.name.clone().unwrap_or_default();
        sqlx::query_as::<_, Role>(
            "UPDATE roles SET name = COALESCE($2, name), \
                              description = COALESCE($3, description) \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| role_write_error(e, &name, "Failed to update role"))?
        .ok_or_else(|| AppError::not_found(format!("Role {id} not found")))
    }

    async fn set_parent(&self, id: RoleId, parent: Option<RoleId>) -> AppResult<Role> {
        sqlx::query_as::<_, Role>("UPDATE roles SET parent_id = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(parent)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    AppError::not_found("Parent role not found")
                }
                _ => role_write_error(e, "", "Failed to set parent role"),
            })?
            .ok_or_else(|| AppError::not_found(format!("Role {id} not found")))
    }

    async fn delete(&self, id: RoleId) -> AppResult<u64> {
        let assignments: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_roles WHERE role_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count assignments", e)
                })?;

        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    AppError::conflict(format!(
                        "Role {id} still has child roles; reassign them first"
                    ))
                }
                _ => AppError::with_source(ErrorKind::Database, "Failed to delete role", e),
            })?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Role {id} not found")));
        }
        Ok(assignments as u64)
    }

    async fn permission_ids(&self, id: RoleId) -> AppResult<Vec<PermissionId>> {
        sqlx::query_scalar::<_, PermissionId>(
            "SELECT permission_id FROM role_permissions WHERE role_id = $1 ORDER BY permission_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load role permissions", e)
        })
    }

    async fn permission_ids_for_roles(&self, roles: &[RoleId]) -> AppResult<Vec<PermissionId>> {
        let raw: Vec<i64> = roles.iter().map(|id| id.get()).collect();
        sqlx::query_scalar::<_, PermissionId>(
            "SELECT DISTINCT permission_id FROM role_permissions \
             WHERE role_id = ANY($1) ORDER BY permission_id",
        )
        .bind(&raw)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load role permissions", e)
        })
    }

    async fn add_permission(&self, id: RoleId, permission: PermissionId) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(permission)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::not_found(format!("Role {id} or permission {permission} not found"))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to add role permission", e),
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_permission(&self, id: RoleId, permission: PermissionId) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2")
                .bind(id)
                .bind(permission)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Database,
                        "Failed to remove role permission",
                        e,
                    )
                })?;
        Ok(result.rows_affected() > 0)
    }
}
