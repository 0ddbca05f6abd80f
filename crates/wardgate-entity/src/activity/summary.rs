//! Per-session activity summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use wardgate_core::types::UserId;

use crate::session::EndReason;

/// Running counters for one session, updated in place.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionSummary {
    /// Hash of the session token.
    pub session_ref: String,
    /// Owning user.
    pub user_id: Option<UserId>,
    /// Client IP seen first.
    pub ip_address: Option<String>,
    /// Client User-Agent seen first.
    pub user_agent: Option<String>,
    /// First recorded activity.
    pub created_at: DateTime<Utc>,
    /// Latest recorded activity.
    pub last_activity: DateTime<Utc>,
    /// Cleared when the session ends.
    pub is_active: bool,
    /// Recorded `view` activities.
    pub page_views: i64,
    /// All recorded activities.
    pub total_requests: i64,
    /// Mean handler latency over requests that reported one.
    pub avg_response_time_ms: f64,
    /// When the session ended.
    pub ended_at: Option<DateTime<Utc>>,
    /// Why the session ended.
    pub end_reason: Option<EndReason>,
}

/// One observation folded into a session summary.
#[derive(Debug, Clone)]
pub struct SummaryTouch {
    pub session_ref: String,
    pub user_id: Option<UserId>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub at: DateTime<Utc>,
    pub response_time_ms: Option<i64>,
    pub page_view: bool,
}

impl SessionSummary {
    /// A fresh summary seeded from its first observation.
    pub fn start(touch: &SummaryTouch) -> Self {
        Self {
            session_ref: touch.session_ref.clone(),
            user_id: touch.user_id,
            ip_address: touch.ip_address.clone(),
            user_agent: touch.user_agent.clone(),
            created_at: touch.at,
            last_activity: touch.at,
            is_active: true,
            page_views: i64::from(touch.page_view),
            total_requests: 1,
            avg_response_time_ms: touch.response_time_ms.unwrap_or(0) as f64,
            ended_at: None,
            end_reason: None,
        }
    }

    /// Fold another observation into the counters.
    pub fn apply(&mut self, touch: &SummaryTouch) {
        if let Some(ms) = touch.response_time_ms {
            let n = self.total_requests as f64;
            self.avg_response_time_ms = (self.avg_response_time_ms * n + ms as f64) / (n + 1.0);
        }
        self.total_requests += 1;
        if touch.page_view {
            self.page_views += 1;
        }
        if touch.at > self.last_activity {
            self.last_activity = touch.at;
        }
        if self.user_id.is_none() {
            self.user_id = touch.user_id;
        }
    }

    /// Mark the session as ended.
    pub fn close(&mut self, at: DateTime<Utc>, reason: EndReason) {
        self.is_active = false;
        self.ended_at = Some(at);
        self.end_reason = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn touch(at: DateTime<Utc>, ms: i64, page_view: bool) -> SummaryTouch {
        SummaryTouch {
            session_ref: "ref".to_string(),
            user_id: Some(UserId(3)),
            ip_address: Some("10.0.0.1".to_string()),
            user_agent: None,
            at,
            response_time_ms: Some(ms),
            page_view,
        }
    }

    #[test]
    fn test_counters_and_average() {
        let t0 = Utc::now();
        let mut summary = SessionSummary::start(&touch(t0, 10, true));
        summary.apply(&touch(t0 + Duration::seconds(1), 30, false));
        summary.apply(&touch(t0 + Duration::seconds(2), 20, true));

        assert_eq!(summary.total_requests, 3);
        assert_eq!(summary.page_views, 2);
        assert!((summary.avg_response_time_ms - 20.0).abs() < f64::EPSILON);
        assert_eq!(summary.last_activity, t0 + Duration::seconds(2));
    }

    #[test]
    fn test_last_activity_never_moves_back() {
        let t0 = Utc::now();
        let mut summary = SessionSummary::start(&touch(t0, 10, true));
        summary.apply(&touch(t0 - Duration::seconds(5), 10, true));
        assert_eq!(summary.last_activity, t0);
    }

    #[test]
    fn test_close() {
        let t0 = Utc::now();
        let mut summary = SessionSummary::start(&touch(t0, 10, true));
        summary.close(t0, EndReason::Inactivity);
        assert!(!summary.is_active);
        assert_eq!(summary.end_reason, Some(EndReason::Inactivity));
    }
}
