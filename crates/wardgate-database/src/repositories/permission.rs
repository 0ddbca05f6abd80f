//! Permission catalogue repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use wardgate_core::error::{AppError, ErrorKind};
use wardgate_core::result::AppResult;
use wardgate_core::types::PermissionId;
use wardgate_entity::permission::{NewPermission, Permission};

use crate::store::identity::PermissionStore;

/// Repository for the permission catalogue.
#[derive(Debug, Clone)]
pub struct PermissionRepository {
    pool: PgPool,
}

impl PermissionRepository {
    /// Create a new permission repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionStore for PermissionRepository {
    async fn insert(&self, new: &NewPermission) -> AppResult<Permission> {
        sqlx::query_as::<_, Permission>(
            "INSERT INTO permissions (object_type, codename, name) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&new.object_type)
        .bind(&new.codename)
        .bind(&new.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("permissions_object_type_codename_key") =>
            {
                AppError::conflict(format!(
                    "Permission '{}.{}' already exists",
                    new.object_type, new.codename
                ))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create permission", e),
        })
    }

    async fn find_by_codename(
        &self,
        object_type: &str,
        codename: &str,
    ) -> AppResult<Option<Permission>> {
        sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE object_type = $1 AND codename = $2",
        )
        .bind(object_type)
        .bind(codename)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find permission", e))
    }

    async fn find_many(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>> {
        let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE id = ANY($1) ORDER BY id",
        )
        .bind(&raw)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load permissions", e))
    }

    async fn list(&self) -> AppResult<Vec<Permission>> {
        sqlx::query_as::<_, Permission>("SELECT * FROM permissions ORDER BY object_type, codename")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list permissions", e)
            })
    }
}
