//! Rule-based anomaly detection.
//!
//! Each rule fires at most once per (rule, subject) within the cooldown.
//! Events may carry a key derived from the stored record they describe;
//! a key seen again within the cooldown is ignored, so replaying an event
//! never raises a second alert. Detector failures are logged and never
//! reach the caller.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::json;
use tracing::{error, info, warn};

use wardgate_auth::credential::{FailureKey, FailureTracker};
use wardgate_core::config::DetectorConfig;
use wardgate_core::result::AppResult;
use wardgate_core::traits::Clock;
use wardgate_core::types::{AlertId, PageRequest, PageResponse, UserId};
use wardgate_database::store::{AlertFilter, AlertStore};
use wardgate_entity::activity::{ActivityAlert, AlertKind, AlertSeverity, NewAlert};
use wardgate_entity::user::User;

/// Who a cooldown applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Subject {
    User(UserId),
    Identifier(String),
    Ip(String),
    Session(String),
    System(String),
}

/// An authenticated (or anonymous) request as seen by the detector.
#[derive(Debug, Clone)]
pub struct RequestObservation<'a> {
    /// Replay key of the stored record, if the request was recorded.
    pub event_key: Option<String>,
    pub user: Option<&'a User>,
    pub path: &'a str,
    /// The route is open to anonymous callers (the login forms).
    pub public: bool,
    pub session_ref: Option<&'a str>,
    pub ip: Option<&'a str>,
    pub at: DateTime<Utc>,
}

struct Inner {
    alerts: Arc<dyn AlertStore>,
    failures: Arc<FailureTracker>,
    clock: Arc<dyn Clock>,
    config: DetectorConfig,
    admin_prefix: String,
    cooldown: Duration,
    high_freq_window: Duration,
    fired: DashMap<(AlertKind, Subject), DateTime<Utc>>,
    seen: DashMap<String, DateTime<Utc>>,
    requests: DashMap<String, VecDeque<DateTime<Utc>>>,
}

/// Turns activity into alerts.
#[derive(Clone)]
pub struct AnomalyDetector {
    inner: Arc<Inner>,
}

impl AnomalyDetector {
    pub fn new(
        alerts: Arc<dyn AlertStore>,
        failures: Arc<FailureTracker>,
        clock: Arc<dyn Clock>,
        config: DetectorConfig,
        admin_prefix: impl Into<String>,
    ) -> Self {
        let cooldown = Duration::from_std(config.cooldown).unwrap_or(Duration::MAX);
        let high_freq_window =
            Duration::from_std(config.high_freq_window).unwrap_or(Duration::MAX);
        Self {
            inner: Arc::new(Inner {
                alerts,
                failures,
                clock,
                config,
                admin_prefix: admin_prefix.into(),
                cooldown,
                high_freq_window,
                fired: DashMap::new(),
                seen: DashMap::new(),
                requests: DashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.inner.config
    }

    /// A failed authentication. The identifier's failures are already
    /// counted by the realm router; the IP's are counted here.
    pub async fn observe_failed_login(
        &self,
        event_key: Option<&str>,
        identifier: &str,
        user_id: Option<UserId>,
        ip: Option<&str>,
    ) -> Option<ActivityAlert> {
        let kind = AlertKind::MultipleFailedLogins;
        let now = self.inner.clock.now();
        if !self.first_sighting(event_key, now) {
            return None;
        }

        let threshold = self.inner.config.failed_login_threshold as usize;
        let by_identifier = self
            .inner
            .failures
            .count(&FailureKey::Identifier(identifier.to_string()), now);
        let by_ip = ip.map_or(0, |ip| {
            self.inner.failures.record(FailureKey::Ip(ip.to_string()), now)
        });
        if !self.enabled(kind) || (by_identifier < threshold && by_ip < threshold) {
            return None;
        }

        let identity = match user_id {
            Some(user) => Subject::User(user),
            None => Subject::Identifier(identifier.to_string()),
        };
        let ip_subject = ip.map(|ip| Subject::Ip(ip.to_string()));
        let subject = match (&ip_subject, by_identifier >= threshold) {
            (Some(ip_subject), false) => ip_subject.clone(),
            _ => identity.clone(),
        };
        if !self.claim(kind, subject, now) {
            return None;
        }
        // The burst is one incident: silence the other subject as well.
        let mut subjects = vec![identity];
        subjects.extend(ip_subject);
        for subject in &subjects {
            self.inner.fired.insert((kind, subject.clone()), now);
        }

        self.raise(
            NewAlert {
                user_id,
                alert_kind: kind,
                severity: AlertSeverity::Warning,
                message: format!(
                    "{} failed login attempts for '{identifier}' within {}",
                    by_identifier.max(by_ip),
                    humanize(self.inner.config.failed_login_window)
                ),
                ip_address: ip.map(str::to_string),
                metadata: json!({
                    "identifier": identifier,
                    "identifier_failures": by_identifier,
                    "ip_failures": by_ip,
                    "threshold": threshold,
                }),
                created_at: now,
            },
            &subjects,
        )
        .await
    }

    /// Per-request rules: access time, privilege escalation, and request
    /// frequency.
    pub async fn observe_request(&self, event: RequestObservation<'_>) -> Vec<ActivityAlert> {
        let mut raised = Vec::new();
        if !self.first_sighting(event.event_key.as_deref(), event.at) {
            return raised;
        }

        if let Some(user) = event.user {
            if let Some(alert) = self.unusual_access_time(user, &event).await {
                raised.push(alert);
            }
            if let Some(alert) = self.privilege_escalation(user, &event).await {
                raised.push(alert);
            }
        }
        if let Some(alert) = self.high_frequency(&event).await {
            raised.push(alert);
        }
        raised
    }

    async fn unusual_access_time(
        &self,
        user: &User,
        event: &RequestObservation<'_>,
    ) -> Option<ActivityAlert> {
        let kind = AlertKind::UnusualAccessTime;
        let (start, end) = self.inner.config.business_hours()?;
        if !self.enabled(kind) {
            return None;
        }
        let local = event.at
            + Duration::minutes(i64::from(self.inner.config.business_hours_utc_offset_minutes));
        let hour = local.hour();
        if hour >= start && hour < end {
            return None;
        }
        let subject = Subject::User(user.id);
        if !self.claim(kind, subject.clone(), event.at) {
            return None;
        }
        self.raise(
            NewAlert {
                user_id: Some(user.id),
                alert_kind: kind,
                severity: AlertSeverity::Info,
                message: format!(
                    "User {} active outside business hours ({hour:02}:00 local)",
                    user.username
                ),
                ip_address: event.ip.map(str::to_string),
                metadata: json!({ "hour": hour, "start": start, "end": end, "path": event.path }),
                created_at: event.at,
            },
            &[subject],
        )
        .await
    }

    async fn privilege_escalation(
        &self,
        user: &User,
        event: &RequestObservation<'_>,
    ) -> Option<ActivityAlert> {
        let kind = AlertKind::PrivilegeEscalation;
        if user.is_staff
            || event.public
            || !self.enabled(kind)
            || !event.path.contains(&self.inner.admin_prefix)
        {
            return None;
        }
        let subject = Subject::User(user.id);
        if !self.claim(kind, subject.clone(), event.at) {
            return None;
        }
        self.raise(
            NewAlert {
                user_id: Some(user.id),
                alert_kind: kind,
                severity: AlertSeverity::Critical,
                message: format!(
                    "Non-staff user {} attempted to access {}",
                    user.username, event.path
                ),
                ip_address: event.ip.map(str::to_string),
                metadata: json!({ "path": event.path }),
                created_at: event.at,
            },
            &[subject],
        )
        .await
    }

    async fn high_frequency(&self, event: &RequestObservation<'_>) -> Option<ActivityAlert> {
        let kind = AlertKind::HighFrequencyRequests;
        let session = event.session_ref?;
        if !self.enabled(kind) {
            return None;
        }
        let count = {
            let mut times = self.inner.requests.entry(session.to_string()).or_default();
            times.push_back(event.at);
            let cutoff = cutoff(event.at, self.inner.high_freq_window);
            while times.front().is_some_and(|t| *t <= cutoff) {
                times.pop_front();
            }
            times.len()
        };
        let threshold = self.inner.config.high_freq_threshold as usize;
        if count <= threshold {
            return None;
        }

        let user_id = event.user.map(|u| u.id);
        let subject = match (user_id, event.ip) {
            (Some(user), _) => Subject::User(user),
            (None, Some(ip)) => Subject::Ip(ip.to_string()),
            (None, None) => Subject::Session(session.to_string()),
        };
        if !self.claim(kind, subject.clone(), event.at) {
            return None;
        }
        self.raise(
            NewAlert {
                user_id,
                alert_kind: kind,
                severity: AlertSeverity::Warning,
                message: format!(
                    "{count} requests in one session within {}",
                    humanize(self.inner.config.high_freq_window)
                ),
                ip_address: event.ip.map(str::to_string),
                metadata: json!({ "count": count, "threshold": threshold }),
                created_at: event.at,
            },
            &[subject],
        )
        .await
    }

    /// One operation touched `affected` records.
    pub async fn observe_bulk_operation(
        &self,
        event_key: Option<&str>,
        actor: Option<UserId>,
        operation: &str,
        affected: u64,
        ip: Option<&str>,
    ) -> Option<ActivityAlert> {
        let kind = AlertKind::BulkOperations;
        let now = self.inner.clock.now();
        let threshold = self.inner.config.bulk_operation_threshold;
        if affected < threshold || !self.enabled(kind) || !self.first_sighting(event_key, now) {
            return None;
        }
        let subject = match (actor, ip) {
            (Some(user), _) => Subject::User(user),
            (None, Some(ip)) => Subject::Ip(ip.to_string()),
            (None, None) => Subject::System(operation.to_string()),
        };
        if !self.claim(kind, subject.clone(), now) {
            return None;
        }
        self.raise(
            NewAlert {
                user_id: actor,
                alert_kind: kind,
                severity: AlertSeverity::Warning,
                message: format!("Bulk operation '{operation}' affected {affected} records"),
                ip_address: ip.map(str::to_string),
                metadata: json!({ "operation": operation, "affected": affected, "threshold": threshold }),
                created_at: now,
            },
            &[subject],
        )
        .await
    }

    /// A component that must not fail its caller failed.
    pub async fn report_system_error(
        &self,
        source: &str,
        message: &str,
        metadata: serde_json::Value,
    ) -> Option<ActivityAlert> {
        let kind = AlertKind::SystemError;
        let now = self.inner.clock.now();
        let subject = Subject::System(source.to_string());
        if !self.enabled(kind) || !self.claim(kind, subject.clone(), now) {
            return None;
        }
        self.raise(
            NewAlert {
                user_id: None,
                alert_kind: kind,
                severity: AlertSeverity::Error,
                message: format!("{source}: {message}"),
                ip_address: None,
                metadata,
                created_at: now,
            },
            &[subject],
        )
        .await
    }

    pub async fn list_alerts(
        &self,
        filter: &AlertFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ActivityAlert>> {
        self.inner.alerts.list(filter, page).await
    }

    /// Resolve an open alert. A second resolution is a conflict.
    pub async fn resolve_alert(
        &self,
        id: AlertId,
        resolved_by: Option<UserId>,
        notes: &str,
    ) -> AppResult<ActivityAlert> {
        let alert = self
            .inner
            .alerts
            .resolve(id, resolved_by, notes, self.inner.clock.now())
            .await?;
        info!(alert_id = %id, resolved_by = ?resolved_by.map(UserId::get), "Alert resolved");
        Ok(alert)
    }

    /// Forget cooldowns, event keys, and request windows that have aged out.
    pub fn purge(&self) {
        let now = self.inner.clock.now();
        let cooldown_cutoff = cutoff(now, self.inner.cooldown);
        let window_cutoff = cutoff(now, self.inner.high_freq_window);
        self.inner.fired.retain(|_, at| *at > cooldown_cutoff);
        self.inner.seen.retain(|_, at| *at > cooldown_cutoff);
        self.inner
            .requests
            .retain(|_, times| times.back().is_some_and(|t| *t > window_cutoff));
        self.inner.failures.purge(now);
    }

    fn enabled(&self, kind: AlertKind) -> bool {
        self.inner.config.rule_enabled(kind.as_str())
    }

    /// Record `key`; `false` if it was already seen within the cooldown.
    /// Keyless events are never tracked.
    fn first_sighting(&self, key: Option<&str>, now: DateTime<Utc>) -> bool {
        let Some(key) = key else {
            return true;
        };
        match self.inner.seen.entry(key.to_string()) {
            Entry::Occupied(mut seen) => {
                if now - *seen.get() < self.inner.cooldown {
                    false
                } else {
                    seen.insert(now);
                    true
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }

    /// Take the cooldown slot for (rule, subject); `false` while cooling down.
    fn claim(&self, kind: AlertKind, subject: Subject, now: DateTime<Utc>) -> bool {
        match self.inner.fired.entry((kind, subject)) {
            Entry::Occupied(mut fired) => {
                if now - *fired.get() < self.inner.cooldown {
                    false
                } else {
                    fired.insert(now);
                    true
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }

    /// Store `alert`. If the store refuses it, the cooldown slots taken for
    /// `subjects` are released so the next occurrence can fire.
    async fn raise(&self, alert: NewAlert, subjects: &[Subject]) -> Option<ActivityAlert> {
        let kind = alert.alert_kind;
        match self.inner.alerts.insert(alert).await {
            Ok(stored) => {
                warn!(
                    alert_id = %stored.id,
                    alert_kind = %kind,
                    severity = %stored.severity,
                    "Alert raised"
                );
                Some(stored)
            }
            Err(e) => {
                error!(alert_kind = %kind, error = %e, "Failed to store alert");
                for subject in subjects {
                    self.inner.fired.remove(&(kind, subject.clone()));
                }
                None
            }
        }
    }
}

fn cutoff(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn humanize(window: std::time::Duration) -> String {
    let secs = window.as_secs();
    match secs {
        s if s >= 3600 && s % 3600 == 0 => format!("{}h", s / 3600),
        s if s >= 60 && s % 60 == 0 => format!("{}m", s / 60),
        s => format!("{s}s"),
    }
}
