//! Wiring of the full service graph.

use std::sync::Arc;

use tracing::info;

use wardgate_activity::{ActivityRecorder, AnomalyDetector, AuditWriter};
use wardgate_auth::credential::{AdminVerifier, AppVerifier, FailureTracker, RealmRouter};
use wardgate_auth::gate::AuthorizationGate;
use wardgate_auth::password::{PasswordHasher, PasswordValidator};
use wardgate_auth::rbac::{PermissionResolver, RoleManager};
use wardgate_auth::session::SessionManager;
use wardgate_core::config::AppConfig;
use wardgate_core::result::AppResult;
use wardgate_core::traits::Clock;
use wardgate_database::Stores;
use wardgate_entity::permission::{NewPermission, split_codename};

use crate::alert::AlertService;
use crate::identity::IdentityService;
use crate::login::AuthService;
use crate::role::RoleService;

/// Permissions the admin endpoints are gated on, as
/// `(qualified codename, human name)`.
pub const CORE_PERMISSIONS: &[(&str, &str)] = &[
    ("activity.view_activity", "Can view activity records"),
    ("activity.view_alert", "Can view activity alerts"),
    ("activity.resolve_alert", "Can resolve activity alerts"),
    ("audit.view_auditlog", "Can view the audit log"),
    ("accounts.change_user", "Can change users"),
];

/// Every service plus the shared components the HTTP layer needs directly.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<AppConfig>,
    pub stores: Stores,
    pub clock: Arc<dyn Clock>,
    pub sessions: SessionManager,
    pub resolver: PermissionResolver,
    pub gate: AuthorizationGate,
    pub recorder: ActivityRecorder,
    pub detector: AnomalyDetector,
    pub audit: AuditWriter,
    pub identity: IdentityService,
    pub roles: RoleService,
    pub auth: AuthService,
    pub alerts: AlertService,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Build the service graph over `stores`.
    pub fn build(stores: Stores, config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let hasher = PasswordHasher::new(config.auth.password_scheme);
        let validator = Arc::new(PasswordValidator::new(&config.auth));
        let failures = Arc::new(FailureTracker::new(config.detector.failed_login_window));
        let admin_prefix = config.auth.admin_path_prefix.clone();

        let router = RealmRouter::new(
            admin_prefix.clone(),
            Arc::new(AdminVerifier::new(stores.users.clone(), hasher.clone())),
            Arc::new(AppVerifier::new(stores.users.clone(), hasher.clone())),
            hasher.clone(),
            failures.clone(),
            clock.clone(),
        );
        let sessions = SessionManager::new(
            stores.sessions.clone(),
            stores.users.clone(),
            clock.clone(),
            &config.session,
        );

        let resolver = PermissionResolver::new(
            stores.users.clone(),
            stores.roles.clone(),
            stores.permissions.clone(),
            &config.rbac,
        );
        let role_manager = RoleManager::new(
            stores.users.clone(),
            stores.roles.clone(),
            stores.permissions.clone(),
            resolver.clone(),
            &config.rbac,
        );
        let gate = AuthorizationGate::new(resolver.clone(), config.server.request_deadline);

        let recorder = ActivityRecorder::new(
            stores.activity.clone(),
            stores.alerts.clone(),
            clock.clone(),
            &config.activity,
        );
        let detector = AnomalyDetector::new(
            stores.alerts.clone(),
            failures,
            clock.clone(),
            config.detector.clone(),
            admin_prefix,
        );
        let audit = AuditWriter::new(stores.audit.clone(), detector.clone(), clock.clone());

        let identity = IdentityService::new(
            stores.users.clone(),
            hasher.clone(),
            validator,
            sessions.clone(),
            role_manager.clone(),
            recorder.clone(),
            detector.clone(),
            audit.clone(),
            clock.clone(),
        );
        let roles = RoleService::new(role_manager, audit.clone());
        let auth = AuthService::new(
            router,
            sessions.clone(),
            stores.users.clone(),
            hasher,
            recorder.clone(),
            detector.clone(),
            clock.clone(),
        );
        let alerts = AlertService::new(detector.clone(), recorder.clone(), clock.clone());

        Self {
            config: Arc::new(config.clone()),
            stores,
            clock,
            sessions,
            resolver,
            gate,
            recorder,
            detector,
            audit,
            identity,
            roles,
            auth,
            alerts,
        }
    }

    /// Register [`CORE_PERMISSIONS`] that are not in the catalogue yet.
    /// Returns how many were inserted.
    pub async fn ensure_core_permissions(&self) -> AppResult<usize> {
        let mut inserted = 0;
        for (qualified, name) in CORE_PERMISSIONS {
            let (object_type, codename) = split_codename(qualified)?;
            if self
                .stores
                .permissions
                .find_by_codename(object_type, codename)
                .await?
                .is_some()
            {
                continue;
            }
            self.stores
                .permissions
                .insert(&NewPermission {
                    object_type: object_type.to_string(),
                    codename: codename.to_string(),
                    name: (*name).to_string(),
                })
                .await?;
            inserted += 1;
        }
        if inserted > 0 {
            info!(inserted, "Registered core permissions");
        }
        Ok(inserted)
    }

    /// Periodic housekeeping: expired sessions and stale detector state.
    pub async fn sweep(&self) -> AppResult<usize> {
        self.auth.sweep().await
    }
}
