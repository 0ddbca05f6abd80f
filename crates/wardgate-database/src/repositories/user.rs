//! User repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use wardgate_core::error::{AppError, ErrorKind};
use wardgate_core::result::AppResult;
use wardgate_core::types::{PermissionId, RoleId, UserId};
use wardgate_entity::user::{NewUser, User, UserChanges, UserProfile};

use crate::store::identity::{UserCascade, UserStore};

/// Repository for users, profiles, role assignments, and direct grants.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &str, id: UserId) -> AppResult<u64> {
        let n: i64 = sqlx::query_scalar(sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count rows", e))?;
        Ok(n as u64)
    }
}

/// Map a unique-constraint violation on `users` to a conflict.
fn user_write_error(e: sqlx::Error, username: &str, phone: &str, context: &str) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.constraint() == Some("users_username_key") => {
            AppError::conflict(format!("Username '{username}' already exists"))
        }
        sqlx::Error::Database(ref db_err) if db_err.constraint() == Some("users_phone_key") => {
            AppError::conflict(format!("Phone '{phone}' already exists"))
        }
        sqlx::Error::Database(ref db_err) if db_err.constraint() == Some("users_email_key") => {
            AppError::conflict("Email already in use")
        }
        sqlx::Error::Database(ref db_err)
            if db_err.constraint() == Some("users_superuser_is_staff") =>
        {
            AppError::validation("A superuser must also be staff")
        }
        _ => AppError::with_source(ErrorKind::Database, context.to_string(), e),
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn insert(&self, new: &NewUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, phone, email, first_name, last_name, password_hash, \
                                is_active, is_staff, is_superuser) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING *",
        )
        .bind(&new.username)
        .bind(&new.phone)
        .bind(&new.email)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.password_hash)
        .bind(new.is_active)
        .bind(new.is_staff)
        .bind(new.is_superuser)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| user_write_error(e, &new.username, &new.phone, "Failed to create user"))
    }

    async fn find(&self, id: UserId) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user by id", e))
    }

    async fn find_many(&self, ids: &[UserId]) -> AppResult<Vec<User>> {
        let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1) ORDER BY id")
            .bind(&raw)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load users", e))
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find user by username", e)
            })
    }

    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = $1")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find user by phone", e)
            })
    }

    async fn update_fields(&self, id: UserId, changes: &UserChanges) -> AppResult<User> {
        let set_email = changes.email.is_some();
        let email = changes.email.clone().flatten();
        sqlx::query_as::<_, User>(
            "UPDATE users SET first_name = COALESCE($2, first_name), \
                              last_name = COALESCE($3, last_name), \
                              email = CASE WHEN $4 THEN $5 ELSE email END \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(set_email)
        .bind(&email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| user_write_error(e, "", "", "Failed to update user"))?
        .ok_or_else(|| AppError::not_found(format!("User {id} not found")))
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update password", e)
            })?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        Ok(())
    }

    async fn set_active(&self, id: UserId, is_active: bool) -> AppResult<User> {
        sqlx::query_as::<_, User>("UPDATE users SET is_active = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(is_active)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to set active flag", e))?
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))
    }

    async fn set_flags(&self, id: UserId, is_staff: bool, is_superuser: bool) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET is_staff = $2, is_superuser = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(is_staff)
        .bind(is_superuser)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| user_write_error(e, "", "", "Failed to set privilege flags"))?
        .ok_or_else(|| AppError::not_found(format!("User {id} not found")))
    }

    async fn touch_last_login(&self, id: UserId, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update last login", e)
            })?;
        Ok(())
    }

    async fn delete(&self, id: UserId) -> AppResult<UserCascade> {
        let cascade = UserCascade {
            role_assignments: self
                .count("SELECT COUNT(*) FROM user_roles WHERE user_id = $1", id)
                .await?,
            direct_permissions: self
                .count("SELECT COUNT(*) FROM user_permissions WHERE user_id = $1", id)
                .await?,
            sessions: self
                .count("SELECT COUNT(*) FROM sessions WHERE user_id = $1", id)
                .await?,
            profiles: self
                .count("SELECT COUNT(*) FROM user_profiles WHERE user_id = $1", id)
                .await?,
        };

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete user", e))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("User {id} not found")));
        }
        Ok(cascade)
    }

    async fn profile(&self, id: UserId, now: DateTime<Utc>) -> AppResult<UserProfile> {
        sqlx::query(
            "INSERT INTO user_profiles (user_id, updated_at) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::not_found(format!("User {id} not found"))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create profile", e),
        })?;

        sqlx::query_as::<_, UserProfile>("SELECT * FROM user_profiles WHERE user_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load profile", e))
    }

    async fn role_ids(&self, id: UserId) -> AppResult<Vec<RoleId>> {
        sqlx::query_scalar::<_, RoleId>(
            "SELECT role_id FROM user_roles WHERE user_id = $1 ORDER BY role_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load user roles", e))
    }

    async fn assign_role(&self, id: UserId, role: RoleId) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(role)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::not_found(format!("User {id} or role {role} not found"))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to assign role", e),
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_role(&self, id: UserId, role: RoleId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(id)
            .bind(role)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to revoke role", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_roles(&self, id: UserId) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to clear roles", e))?;
        Ok(result.rows_affected())
    }

    async fn users_with_any_role(&self, roles: &[RoleId]) -> AppResult<Vec<UserId>> {
        let raw: Vec<i64> = roles.iter().map(|id| id.get()).collect();
        sqlx::query_scalar::<_, UserId>(
            "SELECT DISTINCT user_id FROM user_roles WHERE role_id = ANY($1) ORDER BY user_id",
        )
        .bind(&raw)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load role holders", e)
        })
    }

    async fn direct_permission_ids(&self, id: UserId) -> AppResult<Vec<PermissionId>> {
        sqlx::query_scalar::<_, PermissionId>(
            "SELECT permission_id FROM user_permissions WHERE user_id = $1 ORDER BY permission_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load direct permissions", e)
        })
    }

    async fn grant_permission(&self, id: UserId, permission: PermissionId) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO user_permissions (user_id, permission_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(permission)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::not_found(format!("User {id} or permission {permission} not found"))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to grant permission", e),
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_permission(&self, id: UserId, permission: PermissionId) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM user_permissions WHERE user_id = $1 AND permission_id = $2")
                .bind(id)
                .bind(permission)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to revoke permission", e)
                })?;
        Ok(result.rows_affected() > 0)
    }
}
