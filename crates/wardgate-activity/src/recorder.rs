//! The activity recorder.
//!
//! Recording never fails the caller: store errors are logged and the
//! record is dropped. Every record carrying a session reference is also
//! folded into that session's summary.

use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use wardgate_auth::credential::{AuthFailure, Realm};
use wardgate_core::config::ActivityConfig;
use wardgate_core::result::AppResult;
use wardgate_core::traits::Clock;
use wardgate_core::types::{PageRequest, PageResponse, UserId};
use wardgate_database::store::{ActivityFilter, ActivityStore, AlertStore};
use wardgate_entity::activity::{
    ActionKind, ActivityLevel, ActivityRecord, ActivityStatistics, NewActivityRecord,
    SessionSummary, StatsRange, SummaryTouch,
};
use wardgate_entity::session::{ClientFingerprint, EndReason};
use wardgate_entity::user::User;

use crate::classify::classify;
use crate::skip::SkipSet;

const AUTH_MODULE: &str = "Authentication";

/// A finished request as seen by the interceptor.
#[derive(Debug, Clone)]
pub struct RequestActivity {
    pub user_id: Option<UserId>,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub elapsed_ms: i64,
    pub client: ClientFingerprint,
    pub session_ref: Option<String>,
    pub extra: Option<serde_json::Value>,
}

/// Persists classified activity and maintains session summaries.
#[derive(Clone)]
pub struct ActivityRecorder {
    activity: Arc<dyn ActivityStore>,
    alerts: Arc<dyn AlertStore>,
    clock: Arc<dyn Clock>,
    skip: SkipSet,
}

impl ActivityRecorder {
    pub fn new(
        activity: Arc<dyn ActivityStore>,
        alerts: Arc<dyn AlertStore>,
        clock: Arc<dyn Clock>,
        config: &ActivityConfig,
    ) -> Self {
        Self {
            activity,
            alerts,
            clock,
            skip: SkipSet::from_config(config),
        }
    }

    /// Whether requests to `path` are left unrecorded.
    pub fn skips(&self, path: &str) -> bool {
        self.skip.skips(path)
    }

    /// Classify and record a finished request.
    pub async fn record_request(&self, request: RequestActivity) -> Option<ActivityRecord> {
        if self.skips(&request.path) {
            return None;
        }
        let class = classify(&request.method, &request.path, request.status);
        let mut record = NewActivityRecord::new(
            class.action_kind,
            class.level,
            class.description,
            class.module,
            self.clock.now(),
        )
        .with_user(request.user_id)
        .with_client(request.client.ip, request.client.user_agent)
        .with_session(request.session_ref);
        record.object_repr = match (&class.object_type, &class.object_id) {
            (Some(kind), Some(id)) => Some(format!("{kind} {id}")),
            _ => None,
        };
        record.object_type = class.object_type;
        record.object_id = class.object_id;
        record.method = Some(request.method);
        record.path = Some(request.path);
        record.response_status = Some(i32::from(request.status));
        record.response_time_ms = Some(request.elapsed_ms);
        if let Some(extra) = request.extra {
            record.extra = extra;
        }
        self.record(record).await
    }

    /// Successful authentication.
    pub async fn record_login(
        &self,
        user: &User,
        realm: Realm,
        session_ref: &str,
        client: &ClientFingerprint,
    ) -> Option<ActivityRecord> {
        let record = NewActivityRecord::new(
            ActionKind::Login,
            ActivityLevel::Medium,
            format!("User {} logged in successfully", user.username),
            AUTH_MODULE,
            self.clock.now(),
        )
        .with_user(Some(user.id))
        .with_client(client.ip.clone(), client.user_agent.clone())
        .with_session(Some(session_ref.to_string()))
        .with_extra(json!({ "realm": realm.as_str(), "login_success": true }));
        self.record(record).await
    }

    /// A session ended. The summary is closed with the same reason.
    pub async fn record_logout(
        &self,
        user_id: UserId,
        session_ref: &str,
        reason: EndReason,
        client: &ClientFingerprint,
    ) -> Option<ActivityRecord> {
        let now = self.clock.now();
        let record = NewActivityRecord::new(
            ActionKind::Logout,
            ActivityLevel::Low,
            format!("Session ended ({reason})"),
            AUTH_MODULE,
            now,
        )
        .with_user(Some(user_id))
        .with_client(client.ip.clone(), client.user_agent.clone())
        .with_session(Some(session_ref.to_string()))
        .with_extra(json!({ "end_reason": reason.as_str() }));
        let stored = self.record(record).await;

        if let Err(e) = self.activity.close_summary(session_ref, now, reason).await {
            warn!(error = %e, "Failed to close session summary");
        }
        stored
    }

    /// A rejected authentication. The password is never part of the record.
    pub async fn record_failed_login(
        &self,
        user_id: Option<UserId>,
        identifier: &str,
        realm: Realm,
        failure: AuthFailure,
        client: &ClientFingerprint,
    ) -> Option<ActivityRecord> {
        let record = NewActivityRecord::new(
            ActionKind::AccessDenied,
            ActivityLevel::Medium,
            "User login failed",
            AUTH_MODULE,
            self.clock.now(),
        )
        .with_user(user_id)
        .with_client(client.ip.clone(), client.user_agent.clone())
        .with_extra(json!({
            "identifier": identifier,
            "realm": realm.as_str(),
            "failure": failure.as_str(),
        }));
        self.record(record).await
    }

    /// The gate refused a request.
    pub async fn record_denied(
        &self,
        user_id: Option<UserId>,
        method: &str,
        path: &str,
        reason: &str,
        session_ref: Option<String>,
        client: &ClientFingerprint,
    ) -> Option<ActivityRecord> {
        let class = classify(method, path, 403);
        let mut record = NewActivityRecord::new(
            ActionKind::AccessDenied,
            class.level.max(ActivityLevel::Medium),
            format!("Access denied to {path}"),
            class.module,
            self.clock.now(),
        )
        .with_user(user_id)
        .with_client(client.ip.clone(), client.user_agent.clone())
        .with_session(session_ref)
        .with_extra(json!({ "deny_reason": reason }));
        record.method = Some(method.to_string());
        record.path = Some(path.to_string());
        record.response_status = Some(403);
        self.record(record).await
    }

    /// A request abandoned at its deadline.
    pub async fn record_timeout(
        &self,
        user_id: Option<UserId>,
        method: &str,
        path: &str,
        session_ref: Option<String>,
        client: &ClientFingerprint,
    ) -> Option<ActivityRecord> {
        let class = classify(method, path, 503);
        let mut record = NewActivityRecord::new(
            ActionKind::Error,
            class.level.max(ActivityLevel::Medium),
            format!("{} (deadline exceeded)", class.description),
            class.module,
            self.clock.now(),
        )
        .with_user(user_id)
        .with_client(client.ip.clone(), client.user_agent.clone())
        .with_session(session_ref)
        .with_extra(json!({ "deadline_exceeded": true }));
        record.method = Some(method.to_string());
        record.path = Some(path.to_string());
        record.response_status = Some(503);
        self.record(record).await
    }

    /// Persist a prepared record and fold it into its session summary.
    pub async fn record(&self, record: NewActivityRecord) -> Option<ActivityRecord> {
        let touch = record.session_ref.clone().map(|session_ref| SummaryTouch {
            session_ref,
            user_id: record.user_id,
            ip_address: record.ip_address.clone(),
            user_agent: record.user_agent.clone(),
            at: record.created_at,
            response_time_ms: record.response_time_ms,
            page_view: record.action_kind == ActionKind::View,
        });
        let kind = record.action_kind;

        let stored = match self.activity.append(record).await {
            Ok(stored) => Some(stored),
            Err(e) => {
                warn!(action_kind = %kind, error = %e, "Failed to persist activity record");
                None
            }
        };

        if let Some(touch) = touch {
            if let Err(e) = self.activity.touch_summary(&touch).await {
                warn!(error = %e, "Failed to update session summary");
            }
        }
        stored
    }

    /// Records matching `filter`, newest first.
    pub async fn list(
        &self,
        filter: &ActivityFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ActivityRecord>> {
        self.activity.list(filter, page).await
    }

    pub async fn summary(&self, session_ref: &str) -> AppResult<Option<SessionSummary>> {
        self.activity.find_summary(session_ref).await
    }

    /// Aggregates over the range ending now, plus the open alert count.
    pub async fn statistics(&self, range: StatsRange) -> AppResult<ActivityStatistics> {
        let mut stats = self.activity.statistics(range.since(self.clock.now())).await?;
        stats.open_alerts = self.alerts.count_open().await?;
        Ok(stats)
    }
}
