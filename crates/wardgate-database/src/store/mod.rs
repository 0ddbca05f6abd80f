//! Store traits, one per aggregate, and the [`Stores`] bundle.
//!
//! Every trait is object-safe and `Send + Sync` so that services can hold
//! `Arc<dyn Trait>` and be wired to PostgreSQL or to the in-memory
//! implementation without knowing which.

pub mod activity;
pub mod identity;
pub mod session;

use std::sync::Arc;

use sqlx::PgPool;
use tracing::warn;

use wardgate_core::config::{DatabaseConfig, StorageBackend};
use wardgate_core::result::AppResult;

pub use activity::{
    ActivityFilter, ActivityStore, AlertFilter, AlertStore, AuditFilter, AuditStore,
};
pub use identity::{PermissionStore, RoleStore, UserCascade, UserStore};
pub use session::SessionStore;

use crate::connection::DatabasePool;
use crate::memory::MemoryStore;
use crate::migration::run_migrations;
use crate::repositories::{
    ActivityRepository, AlertRepository, AuditLogRepository, PermissionRepository,
    RoleRepository, SessionRepository, UserRepository,
};

/// One implementation of every store trait.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub roles: Arc<dyn RoleStore>,
    pub permissions: Arc<dyn PermissionStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub activity: Arc<dyn ActivityStore>,
    pub alerts: Arc<dyn AlertStore>,
    pub audit: Arc<dyn AuditStore>,
}

impl Stores {
    /// Open the configured backend. PostgreSQL is migrated before use.
    pub async fn open(config: &DatabaseConfig) -> AppResult<Self> {
        match config.backend {
            StorageBackend::Postgres => {
                let pool = DatabasePool::connect(config).await?;
                run_migrations(pool.pool()).await?;
                Ok(Self::postgres(pool.pool().clone()))
            }
            StorageBackend::Memory => {
                warn!("Using in-memory stores; nothing survives a restart");
                Ok(Self::memory())
            }
        }
    }

    /// Stores backed by PostgreSQL.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            roles: Arc::new(RoleRepository::new(pool.clone())),
            permissions: Arc::new(PermissionRepository::new(pool.clone())),
            sessions: Arc::new(SessionRepository::new(pool.clone())),
            activity: Arc::new(ActivityRepository::new(pool.clone())),
            alerts: Arc::new(AlertRepository::new(pool.clone())),
            audit: Arc::new(AuditLogRepository::new(pool)),
        }
    }

    /// Stores backed by a single shared in-memory state.
    pub fn memory() -> Self {
        Self::from_memory(Arc::new(MemoryStore::new()))
    }

    /// Stores backed by an existing in-memory state, so a test can keep a
    /// handle for inspection.
    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            roles: store.clone(),
            permissions: store.clone(),
            sessions: store.clone(),
            activity: store.clone(),
            alerts: store.clone(),
            audit: store,
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
