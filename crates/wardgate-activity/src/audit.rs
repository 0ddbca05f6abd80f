//! Append-only audit log of privileged mutations.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error};

use wardgate_core::result::AppResult;
use wardgate_core::traits::Clock;
use wardgate_core::types::{PageRequest, PageResponse, UserId};
use wardgate_database::store::{AuditFilter, AuditStore};
use wardgate_entity::audit::{AuditAction, AuditLogEntry, NewAuditEntry};

use crate::detector::AnomalyDetector;

/// Writes audit entries. A failed write is logged and raised as a
/// `system_error` alert; the mutation it describes is not rolled back.
#[derive(Clone)]
pub struct AuditWriter {
    store: Arc<dyn AuditStore>,
    detector: AnomalyDetector,
    clock: Arc<dyn Clock>,
}

impl AuditWriter {
    pub fn new(store: Arc<dyn AuditStore>, detector: AnomalyDetector, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            detector,
            clock,
        }
    }

    /// Record `action` by `actor` (`None` for the system itself).
    pub async fn audit(
        &self,
        actor: Option<UserId>,
        action: AuditAction,
        target: Option<UserId>,
        details: serde_json::Value,
        ip: Option<&str>,
    ) -> Option<AuditLogEntry> {
        let entry = NewAuditEntry {
            actor_id: actor,
            target_user_id: target,
            action,
            details,
            ip_address: ip.map(str::to_string),
            created_at: self.clock.now(),
        };
        match self.store.append(entry).await {
            Ok(stored) => {
                debug!(audit_id = %stored.id, action = %action, "Audit entry written");
                Some(stored)
            }
            Err(e) => {
                error!(action = %action, error = %e, "Failed to write audit entry");
                self.detector
                    .report_system_error(
                        "audit",
                        "Failed to write audit entry",
                        json!({
                            "action": action.as_str(),
                            "actor_id": actor,
                            "target_user_id": target,
                            "error": e.to_string(),
                        }),
                    )
                    .await;
                None
            }
        }
    }

    pub async fn list(
        &self,
        filter: &AuditFilter,
        page: &PageRequest,
    ) -> AppResult<PageResponse<AuditLogEntry>> {
        self.store.list(filter, page).await
    }
}
