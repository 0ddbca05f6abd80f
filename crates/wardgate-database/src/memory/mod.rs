//! In-process store implementations.
//!
//! One [`MemoryStore`] implements every store trait over a single state
//! guarded by a `tokio::sync::RwLock`, so cascades (deleting a user drops
//! its sessions) behave like the relational schema. Two knobs exist for
//! exercising failure paths: an artificial latency applied to every call,
//! and switches that make sink writes or writes to one user fail.

mod activity;
mod identity;
mod session;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::RwLock;

use wardgate_core::error::AppError;
use wardgate_core::result::AppResult;
use wardgate_core::types::{AlertId, PageRequest, PageResponse, PermissionId, RoleId, UserId};
use wardgate_entity::activity::{ActivityAlert, ActivityRecord, SessionSummary};
use wardgate_entity::audit::AuditLogEntry;
use wardgate_entity::permission::Permission;
use wardgate_entity::role::Role;
use wardgate_entity::session::Session;
use wardgate_entity::user::{User, UserProfile};

#[derive(Debug, Default)]
struct Sequences {
    user: i64,
    role: i64,
    permission: i64,
    activity: i64,
    alert: i64,
    audit: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Debug, Default)]
struct MemoryState {
    seq: Sequences,
    users: BTreeMap<UserId, User>,
    profiles: HashMap<UserId, UserProfile>,
    roles: BTreeMap<RoleId, Role>,
    permissions: BTreeMap<PermissionId, Permission>,
    role_permissions: BTreeSet<(RoleId, PermissionId)>,
    user_roles: BTreeSet<(UserId, RoleId)>,
    user_permissions: BTreeSet<(UserId, PermissionId)>,
    sessions: HashMap<String, Session>,
    activities: Vec<ActivityRecord>,
    summaries: HashMap<String, SessionSummary>,
    alerts: BTreeMap<AlertId, ActivityAlert>,
    audit: Vec<AuditLogEntry>,
}

/// In-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    latency: Mutex<Option<Duration>>,
    sink_failures: AtomicBool,
    failing_user: Mutex<Option<UserId>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every subsequent call by `latency` (`None` to disable).
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(|p| p.into_inner()) = latency;
    }

    /// Make activity, summary, alert, and audit writes fail.
    pub fn set_sink_failures(&self, failing: bool) {
        self.sink_failures.store(failing, Ordering::SeqCst);
    }

    /// Make state changes to `user` fail (`None` to disable).
    pub fn set_failing_user(&self, user: Option<UserId>) {
        *self.failing_user.lock().unwrap_or_else(|p| p.into_inner()) = user;
    }

    /// Number of stored activity records.
    pub async fn activity_count(&self) -> usize {
        self.state.read().await.activities.len()
    }

    /// Number of stored sessions.
    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    async fn enter(&self) {
        let latency = *self.latency.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn sink_write(&self, what: &str) -> AppResult<()> {
        if self.sink_failures.load(Ordering::SeqCst) {
            Err(AppError::database(format!("{what}: sink unavailable")))
        } else {
            Ok(())
        }
    }

    fn user_write(&self, id: UserId) -> AppResult<()> {
        let failing = *self.failing_user.lock().unwrap_or_else(|p| p.into_inner());
        if failing == Some(id) {
            Err(AppError::database(format!("user {id}: write rejected")))
        } else {
            Ok(())
        }
    }
}

/// Slice `items` (already sorted) into the requested page.
fn paginate<T>(items: Vec<T>, page: &PageRequest) -> PageResponse<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    PageResponse::new(items, page, total)
}
