//! In-memory activity, alert, and audit stores.
//!
//! Every write here goes through [`MemoryStore::sink_write`] so tests can
//! make the sinks fail while identity and session stores keep working.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use wardgate_core::error::AppError;
use wardgate_core::result::AppResult;
use wardgate_core::types::{
    ActivityId, AlertId, AuditLogId, PageRequest, PageResponse, UserId,
};
use wardgate_entity::activity::{
    ActionKind, ActivityAlert, ActivityRecord, ActivityStatistics, NewActivityRecord, NewAlert,
    SessionSummary, SummaryTouch, UserActivityCount,
};
use wardgate_entity::audit::{AuditLogEntry, NewAuditEntry};
use wardgate_entity::session::EndReason;

use super::{MemoryStore, next, paginate};
use crate::store::activity::{
    ActivityFilter, ActivityStore, AlertFilter, AlertStore, AuditFilter, AuditStore,
};

/// Number of users reported in [`ActivityStatistics::top_users`].
const TOP_USERS: usize = 10;

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn append(&self, record: NewActivityRecord) -> AppResult<ActivityRecord> {
        self.enter().await;
        self.sink_write("append activity")?;
        let mut state = self.state.write().await;
        let id = ActivityId(next(&mut state.seq.activity));
        let record = record.into_record(id);
        state.activities.push(record.clone());
        Ok(record)
    }

    async fn list(
        &self,
        filter: &ActivityFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ActivityRecord>> {
        self.enter().await;
        let state = self.state.read().await;
        let items: Vec<ActivityRecord> = state
            .activities
            .iter()
            .rev()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        Ok(paginate(items, page))
    }

    async fn touch_summary(&self, touch: &SummaryTouch) -> AppResult<SessionSummary> {
        self.enter().await;
        self.sink_write("touch session summary")?;
        let mut state = self.state.write().await;
        let summary = state
            .summaries
            .entry(touch.session_ref.clone())
            .and_modify(|s| s.apply(touch))
            .or_insert_with(|| SessionSummary::start(touch));
        Ok(summary.clone())
    }

    async fn close_summary(
        &self,
        session_ref: &str,
        at: DateTime<Utc>,
        reason: EndReason,
    ) -> AppResult<Option<SessionSummary>> {
        self.enter().await;
        self.sink_write("close session summary")?;
        let mut state = self.state.write().await;
        Ok(state.summaries.get_mut(session_ref).map(|summary| {
            if summary.is_active {
                summary.close(at, reason);
            }
            summary.clone()
        }))
    }

    async fn find_summary(&self, session_ref: &str) -> AppResult<Option<SessionSummary>> {
        self.enter().await;
        Ok(self.state.read().await.summaries.get(session_ref).cloned())
    }

    async fn statistics(&self, since: DateTime<Utc>) -> AppResult<ActivityStatistics> {
        self.enter().await;
        let state = self.state.read().await;

        let mut stats = ActivityStatistics {
            since: Some(since),
            ..ActivityStatistics::default()
        };
        let mut per_user: HashMap<UserId, u64> = HashMap::new();
        let mut by_level: BTreeMap<String, u64> = BTreeMap::new();
        let mut by_module: BTreeMap<String, u64> = BTreeMap::new();

        for record in state.activities.iter().filter(|r| r.created_at >= since) {
            stats.total += 1;
            if record.action_kind == ActionKind::Error {
                stats.errors += 1;
            }
            *by_level.entry(record.level.to_string()).or_default() += 1;
            *by_module.entry(record.module.clone()).or_default() += 1;
            if let Some(user_id) = record.user_id {
                *per_user.entry(user_id).or_default() += 1;
            }
        }

        let mut top: Vec<UserActivityCount> = per_user
            .into_iter()
            .map(|(user_id, count)| UserActivityCount { user_id, count })
            .collect();
        top.sort_by(|a, b| b.count.cmp(&a.count).then(a.user_id.cmp(&b.user_id)));
        top.truncate(TOP_USERS);

        stats.by_level = by_level;
        stats.by_module = by_module;
        stats.top_users = top;
        Ok(stats)
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn insert(&self, alert: NewAlert) -> AppResult<ActivityAlert> {
        self.enter().await;
        self.sink_write("insert alert")?;
        let mut state = self.state.write().await;
        let id = AlertId(next(&mut state.seq.alert));
        let alert = alert.into_alert(id);
        state.alerts.insert(id, alert.clone());
        Ok(alert)
    }

    async fn find(&self, id: AlertId) -> AppResult<Option<ActivityAlert>> {
        self.enter().await;
        Ok(self.state.read().await.alerts.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &AlertFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ActivityAlert>> {
        self.enter().await;
        let state = self.state.read().await;
        let items: Vec<ActivityAlert> = state
            .alerts
            .values()
            .rev()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        Ok(paginate(items, page))
    }

    async fn resolve(
        &self,
        id: AlertId,
        resolved_by: Option<UserId>,
        notes: &str,
        at: DateTime<Utc>,
    ) -> AppResult<ActivityAlert> {
        self.enter().await;
        self.sink_write("resolve alert")?;
        let mut state = self.state.write().await;
        let alert = state
            .alerts
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Alert {id} not found")))?;
        if alert.is_resolved {
            return Err(AppError::conflict(format!("Alert {id} is already resolved")));
        }
        alert.is_resolved = true;
        alert.resolved_by = resolved_by;
        alert.resolved_at = Some(at);
        alert.resolution_notes = Some(notes.to_string());
        Ok(alert.clone())
    }

    async fn count_open(&self) -> AppResult<u64> {
        self.enter().await;
        let state = self.state.read().await;
        Ok(state.alerts.values().filter(|a| !a.is_resolved).count() as u64)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(&self, entry: NewAuditEntry) -> AppResult<AuditLogEntry> {
        self.enter().await;
        self.sink_write("append audit entry")?;
        let mut state = self.state.write().await;
        let id = AuditLogId(next(&mut state.seq.audit));
        let entry = entry.into_entry(id);
        state.audit.push(entry.clone());
        Ok(entry)
    }

    async fn list(
        &self,
        filter: &AuditFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<AuditLogEntry>> {
        self.enter().await;
        let state = self.state.read().await;
        let items: Vec<AuditLogEntry> = state
            .audit
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        Ok(paginate(items, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use wardgate_core::ErrorKind;
    use wardgate_entity::activity::{ActivityLevel, AlertKind, AlertSeverity};

    fn record(user: Option<i64>, kind: ActionKind, at: DateTime<Utc>) -> NewActivityRecord {
        NewActivityRecord::new(kind, ActivityLevel::Low, "test", "Patients", at)
            .with_user(user.map(UserId))
    }

    fn alert(at: DateTime<Utc>) -> NewAlert {
        NewAlert {
            user_id: None,
            alert_kind: AlertKind::SuspiciousIp,
            severity: AlertSeverity::Warning,
            message: "odd".to_string(),
            ip_address: Some("10.0.0.9".to_string()),
            metadata: serde_json::json!({}),
            created_at: at,
        }
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for i in 0..3 {
            ActivityStore::append(&store, record(Some(1), ActionKind::View, now + Duration::seconds(i)))
                .await
                .unwrap();
        }
        let page = ActivityStore::list(&store, &ActivityFilter::default(), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_items, 3);
        assert!(page.items[0].created_at > page.items[2].created_at);
    }

    #[tokio::test]
    async fn test_statistics_window() {
        let store = MemoryStore::new();
        let now = Utc::now();
        ActivityStore::append(&store, record(Some(1), ActionKind::View, now)).await.unwrap();
        ActivityStore::append(&store, record(Some(1), ActionKind::Error, now)).await.unwrap();
        ActivityStore::append(&store, record(Some(2), ActionKind::View, now)).await.unwrap();
        ActivityStore::append(&store, record(Some(2), ActionKind::View, now - Duration::days(3)))
            .await
            .unwrap();

        let stats = store.statistics(now - Duration::days(1)).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.by_module.get("Patients"), Some(&3));
        assert_eq!(stats.top_users[0], UserActivityCount { user_id: UserId(1), count: 2 });
    }

    #[tokio::test]
    async fn test_resolve_alert_once() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let raised = AlertStore::insert(&store, alert(now)).await.unwrap();
        assert_eq!(store.count_open().await.unwrap(), 1);

        let resolved = store.resolve(raised.id, Some(UserId(7)), "checked", now).await.unwrap();
        assert!(resolved.is_resolved);
        assert_eq!(resolved.resolved_by, Some(UserId(7)));
        assert_eq!(store.count_open().await.unwrap(), 0);

        let again = store.resolve(raised.id, Some(UserId(7)), "again", now).await.unwrap_err();
        assert_eq!(again.kind, ErrorKind::Conflict);
        let missing = store.resolve(AlertId(99), None, "", now).await.unwrap_err();
        assert_eq!(missing.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_sink_failures() {
        let store = MemoryStore::new();
        store.set_sink_failures(true);
        let result = ActivityStore::append(&store, record(None, ActionKind::View, Utc::now())).await;
        assert_eq!(result.unwrap_err().kind, ErrorKind::Database);
        assert_eq!(store.activity_count().await, 0);
    }

    #[tokio::test]
    async fn test_summary_upsert_and_close() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let touch = SummaryTouch {
            session_ref: "s1".to_string(),
            user_id: Some(UserId(1)),
            ip_address: None,
            user_agent: None,
            at: now,
            response_time_ms: Some(12),
            page_view: true,
        };
        store.touch_summary(&touch).await.unwrap();
        let summary = store.touch_summary(&touch).await.unwrap();
        assert_eq!(summary.total_requests, 2);

        let closed = store
            .close_summary("s1", now, EndReason::Manual)
            .await
            .unwrap()
            .unwrap();
        assert!(!closed.is_active);
        assert!(store.close_summary("nope", now, EndReason::Manual).await.unwrap().is_none());
    }
}
