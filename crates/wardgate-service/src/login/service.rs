//! Authentication service.

use std::sync::Arc;

use tracing::{debug, warn};

use wardgate_activity::{ActivityRecorder, AnomalyDetector};
use wardgate_auth::credential::{Realm, RealmRouter, Verification};
use wardgate_auth::password::PasswordHasher;
use wardgate_auth::session::{IssuedSession, Resolution, SessionManager, SessionStatus};
use wardgate_core::error::AppError;
use wardgate_core::result::AppResult;
use wardgate_core::traits::Clock;
use wardgate_database::store::UserStore;
use wardgate_entity::session::{ClientFingerprint, EndReason, Session};
use wardgate_entity::user::User;

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub issued: IssuedSession,
    pub realm: Realm,
}

/// Ties the realm router, the session manager, and the activity pipeline
/// together.
#[derive(Clone)]
pub struct AuthService {
    router: RealmRouter,
    sessions: SessionManager,
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    recorder: ActivityRecorder,
    detector: AnomalyDetector,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(
        router: RealmRouter,
        sessions: SessionManager,
        users: Arc<dyn UserStore>,
        hasher: PasswordHasher,
        recorder: ActivityRecorder,
        detector: AnomalyDetector,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            router,
            sessions,
            users,
            hasher,
            recorder,
            detector,
            clock,
        }
    }

    pub fn router(&self) -> &RealmRouter {
        &self.router
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Authenticate against `realm` and open a session.
    ///
    /// Every failure surfaces as the same authentication error; the
    /// specific reason only reaches the activity record.
    pub async fn login(
        &self,
        realm: Realm,
        identifier: &str,
        password: &str,
        client: &ClientFingerprint,
    ) -> AppResult<LoginOutcome> {
        let attempt = self.router.authenticate(realm, identifier, password).await?;

        let user = match attempt.outcome {
            Verification::Verified(user) => user,
            Verification::Rejected { user, reason } => {
                let user_id = user.as_ref().map(|u| u.id);
                let record = self
                    .recorder
                    .record_failed_login(user_id, identifier, realm, reason, client)
                    .await;
                self.detector
                    .observe_failed_login(
                        record.map(|r| format!("activity:{}", r.id)).as_deref(),
                        identifier,
                        user_id,
                        client.ip.as_deref(),
                    )
                    .await;
                return Err(AppError::authentication("Invalid credentials"));
            }
        };

        if self.hasher.needs_rehash(&user.password_hash) {
            self.rehash(&user, password).await;
        }
        if let Err(e) = self.users.touch_last_login(user.id, self.clock.now()).await {
            warn!(user_id = %user.id, error = %e, "Failed to update last login");
        }

        let issued = self.sessions.issue(&user, client).await?;
        for old in &issued.preempted {
            self.recorder
                .record_logout(user.id, &old.token_hash, EndReason::Concurrent, client)
                .await;
        }
        self.recorder
            .record_login(&user, realm, &issued.session.token_hash, client)
            .await;

        Ok(LoginOutcome {
            user,
            issued,
            realm,
        })
    }

    /// Move a verified password to the configured scheme.
    async fn rehash(&self, user: &User, password: &str) {
        let result = match self.hasher.hash_password(password) {
            Ok(hash) => self.users.set_password_hash(user.id, &hash).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => debug!(user_id = %user.id, "Password rehashed"),
            Err(e) => warn!(user_id = %user.id, error = %e, "Password rehash failed"),
        }
    }

    /// End the session behind `token`.
    pub async fn logout(
        &self,
        token: &str,
        reason: EndReason,
        client: &ClientFingerprint,
    ) -> AppResult<Option<Session>> {
        let ended = self.sessions.invalidate(token, reason).await?;
        if let Some(session) = &ended {
            self.recorder
                .record_logout(session.user_id, &session.token_hash, reason, client)
                .await;
        }
        Ok(ended)
    }

    /// Resolve a token. Sessions that end here are recorded as logouts.
    pub async fn resolve(&self, token: &str, client: &ClientFingerprint) -> AppResult<Resolution> {
        let resolution = self.sessions.resolve(token).await?;
        match &resolution {
            Resolution::Expired(session) => {
                self.recorder
                    .record_logout(session.user_id, &session.token_hash, EndReason::Inactivity, client)
                    .await;
            }
            Resolution::Revoked(session) => {
                self.recorder
                    .record_logout(session.user_id, &session.token_hash, EndReason::Security, client)
                    .await;
            }
            Resolution::Active { .. } | Resolution::Unknown => {}
        }
        Ok(resolution)
    }

    pub async fn status(&self, token: &str) -> AppResult<Option<SessionStatus>> {
        self.sessions.status(token).await
    }

    /// Delete expired sessions, record each as an inactivity logout, and
    /// age out detector state. Returns how many sessions ended.
    pub async fn sweep(&self) -> AppResult<usize> {
        let expired = self.sessions.sweep_expired().await?;
        for session in &expired {
            self.recorder
                .record_logout(
                    session.user_id,
                    &session.token_hash,
                    EndReason::Inactivity,
                    &ClientFingerprint::default(),
                )
                .await;
        }
        self.detector.purge();
        Ok(expired.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, PASSWORD};
    use wardgate_core::config::{AppConfig, ConcurrencyPolicy, PasswordScheme};
    use wardgate_core::error::ErrorKind;
    use wardgate_core::types::PageRequest;
    use wardgate_database::store::{ActivityFilter, ActivityStore};
    use wardgate_entity::activity::ActionKind;

    fn client() -> ClientFingerprint {
        ClientFingerprint {
            ip: Some("10.0.0.5".to_string()),
            user_agent: Some("ward-tablet".to_string()),
        }
    }

    async fn records(f: &Fixture) -> Vec<wardgate_entity::activity::ActivityRecord> {
        ActivityStore::list(&*f.memory, &ActivityFilter::default(), &PageRequest::new(1, 100))
            .await
            .unwrap()
            .items
    }

    #[tokio::test]
    async fn test_failed_login_records_exactly_once() {
        let f = Fixture::new();
        let user = f.user("nurse", "0712").await;

        let err = f
            .services
            .auth
            .login(Realm::Application, "0712", "wrong-password", &client())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(err.message, "Invalid credentials");

        let all = records(&f).await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].action_kind, ActionKind::AccessDenied);
        assert_eq!(all[0].user_id, Some(user.id));
        assert_eq!(all[0].ip_address.as_deref(), Some("10.0.0.5"));
        assert_eq!(f.memory.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_identifier_fails_like_wrong_password() {
        let f = Fixture::new();
        let err = f
            .services
            .auth
            .login(Realm::Admin, "ghost", PASSWORD, &client())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(err.message, "Invalid credentials");

        let all = records(&f).await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].user_id, None);
    }

    #[tokio::test]
    async fn test_login_records_and_touches_last_login() {
        let f = Fixture::new();
        let user = f.user("nurse", "0712").await;
        assert!(user.last_login.is_none());

        let outcome = f
            .services
            .auth
            .login(Realm::Application, "0712", PASSWORD, &client())
            .await
            .unwrap();
        assert_eq!(outcome.user.id, user.id);
        assert_eq!(outcome.realm, Realm::Application);

        let stored = f.services.identity.get(user.id).await.unwrap();
        assert_eq!(stored.last_login, Some(f.clock.now()));

        let all = records(&f).await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].action_kind, ActionKind::Login);
        assert_eq!(
            all[0].session_ref.as_deref(),
            Some(outcome.issued.session.token_hash.as_str())
        );
    }

    #[tokio::test]
    async fn test_realms_are_isolated() {
        let f = Fixture::new();
        f.user("nurse", "0712").await;

        let err = f
            .services
            .auth
            .login(Realm::Admin, "nurse", PASSWORD, &client())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);

        let err = f
            .services
            .auth
            .login(Realm::Application, "nurse", PASSWORD, &client())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn test_login_rehashes_legacy_hash() {
        let f = Fixture::new();
        let user = f.user("nurse", "0712").await;
        let legacy = PasswordHasher::new(PasswordScheme::Bcrypt)
            .with_bcrypt_cost(4)
            .hash_password(PASSWORD)
            .unwrap();
        f.memory.set_password_hash(user.id, &legacy).await.unwrap();

        f.services
            .auth
            .login(Realm::Application, "0712", PASSWORD, &client())
            .await
            .unwrap();

        let stored = f.services.identity.get(user.id).await.unwrap();
        assert!(stored.password_hash.starts_with("$argon2id$"));
        assert!(f.services.identity.verify_password(&stored, PASSWORD).unwrap());
    }

    #[tokio::test]
    async fn test_single_session_policy_preempts() {
        let mut config = AppConfig::default();
        config.session.concurrency = ConcurrencyPolicy::Single;
        let f = Fixture::with_config(config);
        f.user("nurse", "0712").await;

        let first = f
            .services
            .auth
            .login(Realm::Application, "0712", PASSWORD, &client())
            .await
            .unwrap();
        let second = f
            .services
            .auth
            .login(Realm::Application, "0712", PASSWORD, &client())
            .await
            .unwrap();
        assert_eq!(second.issued.preempted.len(), 1);
        assert_eq!(f.memory.session_count().await, 1);

        let resolution = f.services.auth.resolve(&first.issued.token, &client()).await.unwrap();
        assert!(matches!(resolution, Resolution::Unknown));

        let summary = f
            .services
            .recorder
            .summary(&first.issued.session.token_hash)
            .await
            .unwrap()
            .unwrap();
        assert!(!summary.is_active);
        assert_eq!(summary.end_reason, Some(EndReason::Concurrent));
    }

    #[tokio::test]
    async fn test_sweep_records_inactivity() {
        let f = Fixture::new();
        f.user("nurse", "0712").await;
        let outcome = f
            .services
            .auth
            .login(Realm::Application, "0712", PASSWORD, &client())
            .await
            .unwrap();

        f.clock.advance(chrono::Duration::hours(1));
        assert_eq!(f.services.sweep().await.unwrap(), 1);
        assert_eq!(f.memory.session_count().await, 0);

        let summary = f
            .services
            .recorder
            .summary(&outcome.issued.session.token_hash)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.end_reason, Some(EndReason::Inactivity));
    }

    #[tokio::test]
    async fn test_logout_unknown_token_is_noop() {
        let f = Fixture::new();
        let ended = f
            .services
            .auth
            .logout("not-a-token", EndReason::Manual, &client())
            .await
            .unwrap();
        assert!(ended.is_none());
        assert!(records(&f).await.is_empty());
    }
}
