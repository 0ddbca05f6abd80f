//! Alert listing and resolution.

use std::sync::Arc;

use serde_json::json;

use wardgate_activity::{ActivityRecorder, AnomalyDetector};
use wardgate_core::result::AppResult;
use wardgate_core::traits::Clock;
use wardgate_core::types::{AlertId, PageRequest, PageResponse};
use wardgate_database::store::AlertFilter;
use wardgate_entity::activity::{ActionKind, ActivityAlert, ActivityLevel, NewActivityRecord};

use crate::context::RequestContext;

#[derive(Clone)]
pub struct AlertService {
    detector: AnomalyDetector,
    recorder: ActivityRecorder,
    clock: Arc<dyn Clock>,
}

impl AlertService {
    pub fn new(detector: AnomalyDetector, recorder: ActivityRecorder, clock: Arc<dyn Clock>) -> Self {
        Self {
            detector,
            recorder,
            clock,
        }
    }

    pub async fn list(
        &self,
        filter: &AlertFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ActivityAlert>> {
        self.detector.list_alerts(filter, page).await
    }

    /// Resolve an open alert on behalf of the acting operator (or the
    /// system, from the CLI).
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        id: AlertId,
        notes: &str,
    ) -> AppResult<ActivityAlert> {
        let alert = self.detector.resolve_alert(id, ctx.actor_id, notes).await?;

        let client = ctx.client();
        let mut record = NewActivityRecord::new(
            ActionKind::Update,
            ActivityLevel::Medium,
            format!("Resolved activity alert {id}"),
            "Activity",
            self.clock.now(),
        )
        .with_user(ctx.actor_id)
        .with_client(client.ip, client.user_agent)
        .with_extra(json!({ "alert_kind": alert.alert_kind.as_str(), "notes": notes }));
        record.object_type = Some("activity_alert".to_string());
        record.object_id = Some(id.to_string());
        self.recorder.record(record).await;

        Ok(alert)
    }
}
