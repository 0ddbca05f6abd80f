//! Activity, alert, and audit store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wardgate_core::result::AppResult;
use wardgate_core::types::{AlertId, PageRequest, PageResponse, UserId};
use wardgate_entity::activity::{
    ActivityAlert, ActivityLevel, ActivityRecord, ActivityStatistics, AlertKind, AlertSeverity,
    NewActivityRecord, NewAlert, SessionSummary, SummaryTouch,
};
use wardgate_entity::audit::{AuditAction, AuditLogEntry, NewAuditEntry};
use wardgate_entity::session::EndReason;

/// Filter for activity listings. Empty fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityFilter {
    pub user_id: Option<UserId>,
    pub session_ref: Option<String>,
    pub min_level: Option<ActivityLevel>,
    pub since: Option<DateTime<Utc>>,
}

impl ActivityFilter {
    /// Whether `record` passes the filter.
    pub fn matches(&self, record: &ActivityRecord) -> bool {
        self.user_id.is_none_or(|u| record.user_id == Some(u))
            && self
                .session_ref
                .as_ref()
                .is_none_or(|s| record.session_ref.as_ref() == Some(s))
            && self.min_level.is_none_or(|l| record.level >= l)
            && self.since.is_none_or(|t| record.created_at >= t)
    }
}

/// Filter for alert listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertFilter {
    pub open_only: bool,
    pub severity: Option<AlertSeverity>,
    pub kind: Option<AlertKind>,
    pub user_id: Option<UserId>,
}

impl AlertFilter {
    /// Whether `alert` passes the filter.
    pub fn matches(&self, alert: &ActivityAlert) -> bool {
        (!self.open_only || !alert.is_resolved)
            && self.severity.is_none_or(|s| alert.severity == s)
            && self.kind.is_none_or(|k| alert.alert_kind == k)
            && self.user_id.is_none_or(|u| alert.user_id == Some(u))
    }
}

/// Filter for audit listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditFilter {
    pub actor_id: Option<UserId>,
    pub target_user_id: Option<UserId>,
    pub action: Option<AuditAction>,
}

impl AuditFilter {
    /// Whether `entry` passes the filter.
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.actor_id.is_none_or(|a| entry.actor_id == Some(a))
            && self.target_user_id.is_none_or(|t| entry.target_user_id == Some(t))
            && self.action.is_none_or(|a| entry.action == a)
    }
}

/// Append-only activity stream plus per-session summaries.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn append(&self, record: NewActivityRecord) -> AppResult<ActivityRecord>;

    /// Newest first.
    async fn list(
        &self,
        filter: &ActivityFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ActivityRecord>>;

    /// Create the summary for the touched session or fold the touch into it.
    async fn touch_summary(&self, touch: &SummaryTouch) -> AppResult<SessionSummary>;

    async fn close_summary(
        &self,
        session_ref: &str,
        at: DateTime<Utc>,
        reason: EndReason,
    ) -> AppResult<Option<SessionSummary>>;

    async fn find_summary(&self, session_ref: &str) -> AppResult<Option<SessionSummary>>;

    /// Aggregate counts over records created at or after `since`. The
    /// `open_alerts` field is left at zero for the caller to fill.
    async fn statistics(&self, since: DateTime<Utc>) -> AppResult<ActivityStatistics>;
}

/// Alerts raised by the anomaly detector.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn insert(&self, alert: NewAlert) -> AppResult<ActivityAlert>;

    async fn find(&self, id: AlertId) -> AppResult<Option<ActivityAlert>>;

    /// Newest first.
    async fn list(
        &self,
        filter: &AlertFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ActivityAlert>>;

    /// Move an open alert to resolved. Not-found and already-resolved are
    /// reported as errors.
    async fn resolve(
        &self,
        id: AlertId,
        resolved_by: Option<UserId>,
        notes: &str,
        at: DateTime<Utc>,
    ) -> AppResult<ActivityAlert>;

    async fn count_open(&self) -> AppResult<u64>;
}

/// Append-only audit log.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: NewAuditEntry) -> AppResult<AuditLogEntry>;

    /// Newest first.
    async fn list(
        &self,
        filter: &AuditFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<AuditLogEntry>>;
}
