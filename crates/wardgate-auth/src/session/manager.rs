//! Session manager: issue, resolve, and invalidate session tokens.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use wardgate_core::config::{ConcurrencyPolicy, SessionConfig};
use wardgate_core::result::AppResult;
use wardgate_core::traits::Clock;
use wardgate_core::types::UserId;
use wardgate_database::store::{SessionStore, UserStore};
use wardgate_entity::session::{ClientFingerprint, EndReason, Session};
use wardgate_entity::user::User;

use super::token::{generate_token, sha256_hex};

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Plaintext token for the client. Not stored anywhere.
    pub token: String,
    /// Stored session row.
    pub session: Session,
    /// Older sessions removed by the single-session policy.
    pub preempted: Vec<Session>,
}

/// Outcome of resolving a token.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The session is live; its expiry has been extended.
    Active { user: User, session: Session },
    /// The idle timeout elapsed. The row has been deleted.
    Expired(Session),
    /// The owning user is gone or deactivated. The row has been deleted.
    Revoked(Session),
    /// No session matches the token.
    Unknown,
}

/// Read-only view of a session's remaining lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub expires_at: DateTime<Utc>,
    pub seconds_remaining: i64,
    pub warning: bool,
}

/// Manages the complete session lifecycle.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    idle_timeout: Duration,
    warning_threshold: Duration,
    concurrency: ConcurrencyPolicy,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("idle_timeout", &self.idle_timeout)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl SessionManager {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            sessions,
            users,
            clock,
            idle_timeout: Duration::from_std(config.idle_timeout).unwrap_or(Duration::MAX),
            warning_threshold: Duration::from_std(config.warning_threshold)
                .unwrap_or(Duration::zero()),
            concurrency: config.concurrency,
        }
    }

    /// Hash under which a token's session is stored.
    pub fn token_ref(token: &str) -> String {
        sha256_hex(token)
    }

    /// Issue a new session for `user`.
    ///
    /// Under the single-session policy the user's older sessions are
    /// deleted first and returned in `preempted`.
    pub async fn issue(&self, user: &User, fp: &ClientFingerprint) -> AppResult<IssuedSession> {
        let preempted = match self.concurrency {
            ConcurrencyPolicy::Single => self.sessions.delete_for_user(user.id).await?,
            ConcurrencyPolicy::Allow => Vec::new(),
        };

        let now = self.clock.now();
        let token = generate_token();
        let session = Session {
            token_hash: sha256_hex(&token),
            user_id: user.id,
            created_at: now,
            last_activity: now,
            expiry: now + self.idle_timeout,
            ip_address: fp.ip.clone(),
            user_agent_hash: fp.user_agent.as_deref().map(sha256_hex),
        };
        self.sessions.insert(&session).await?;

        info!(
            user_id = %user.id,
            preempted = preempted.len(),
            expiry = %session.expiry,
            "Session issued"
        );
        Ok(IssuedSession {
            token,
            session,
            preempted,
        })
    }

    /// Resolve a token, extending the session on success.
    pub async fn resolve(&self, token: &str) -> AppResult<Resolution> {
        let hash = sha256_hex(token);
        let Some(session) = self.sessions.find(&hash).await? else {
            return Ok(Resolution::Unknown);
        };

        let now = self.clock.now();
        if session.is_expired_at(now) {
            self.sessions.delete(&hash).await?;
            debug!(user_id = %session.user_id, "Session expired");
            return Ok(Resolution::Expired(session));
        }

        let user = match self.users.find(session.user_id).await? {
            Some(user) if user.is_active => user,
            _ => {
                self.sessions.delete(&hash).await?;
                info!(user_id = %session.user_id, "Session revoked for unavailable user");
                return Ok(Resolution::Revoked(session));
            }
        };

        let last_activity = session.last_activity.max(now);
        let expiry = last_activity + self.idle_timeout;
        if !self.sessions.touch(&hash, last_activity, expiry).await? {
            return Ok(Resolution::Unknown);
        }

        Ok(Resolution::Active {
            user,
            session: Session {
                last_activity,
                expiry,
                ..session
            },
        })
    }

    /// Invalidate a single session by its plaintext token.
    pub async fn invalidate(&self, token: &str, reason: EndReason) -> AppResult<Option<Session>> {
        self.invalidate_ref(&sha256_hex(token), reason).await
    }

    /// Invalidate a single session by its stored hash.
    pub async fn invalidate_ref(
        &self,
        token_hash: &str,
        reason: EndReason,
    ) -> AppResult<Option<Session>> {
        let removed = self.sessions.delete(token_hash).await?;
        if let Some(session) = &removed {
            info!(user_id = %session.user_id, reason = %reason, "Session invalidated");
        }
        Ok(removed)
    }

    /// Invalidate every session of a user.
    pub async fn invalidate_all_for_user(
        &self,
        user_id: UserId,
        reason: EndReason,
    ) -> AppResult<Vec<Session>> {
        let removed = self.sessions.delete_for_user(user_id).await?;
        if !removed.is_empty() {
            info!(
                user_id = %user_id,
                count = removed.len(),
                reason = %reason,
                "All user sessions invalidated"
            );
        }
        Ok(removed)
    }

    /// Remaining lifetime of a session, without touching it.
    pub async fn status(&self, token: &str) -> AppResult<Option<SessionStatus>> {
        let Some(session) = self.sessions.find(&sha256_hex(token)).await? else {
            return Ok(None);
        };
        let now = self.clock.now();
        if session.is_expired_at(now) {
            return Ok(None);
        }
        Ok(Some(SessionStatus {
            expires_at: session.expiry,
            seconds_remaining: session.seconds_remaining(now),
            warning: session.expiry - now < self.warning_threshold,
        }))
    }

    /// Delete every expired session and return the removed rows.
    pub async fn sweep_expired(&self) -> AppResult<Vec<Session>> {
        let removed = self.sessions.delete_expired(self.clock.now()).await?;
        if !removed.is_empty() {
            info!(count = removed.len(), "Expired sessions swept");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wardgate_core::traits::ManualClock;
    use wardgate_database::memory::MemoryStore;
    use wardgate_entity::user::NewUser;

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        manager: SessionManager,
        user: User,
    }

    async fn fixture(concurrency: ConcurrencyPolicy) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        ));
        let user = UserStore::insert(
            &*store,
            &NewUser {
                username: "doc".to_string(),
                phone: "0805".to_string(),
                email: None,
                first_name: String::new(),
                last_name: String::new(),
                password_hash: "x".to_string(),
                is_active: true,
                is_staff: false,
                is_superuser: false,
            },
        )
        .await
        .unwrap();
        let config = SessionConfig {
            concurrency,
            ..SessionConfig::default()
        };
        let manager = SessionManager::new(store.clone(), store.clone(), clock.clone(), &config);
        Fixture {
            store,
            clock,
            manager,
            user,
        }
    }

    #[tokio::test]
    async fn test_idle_expiry_boundary() {
        let f = fixture(ConcurrencyPolicy::Allow).await;
        let issued = f.manager.issue(&f.user, &ClientFingerprint::default()).await.unwrap();

        f.clock.advance(Duration::minutes(29));
        match f.manager.resolve(&issued.token).await.unwrap() {
            Resolution::Active { session, .. } => {
                assert_eq!(session.expiry, f.clock.now() + Duration::minutes(30));
            }
            other => panic!("expected active, got {other:?}"),
        }

        // Exactly at expiry is still valid.
        f.clock.advance(Duration::minutes(30));
        assert!(matches!(
            f.manager.resolve(&issued.token).await.unwrap(),
            Resolution::Active { .. }
        ));

        f.clock.advance(Duration::minutes(30) + Duration::seconds(1));
        assert!(matches!(
            f.manager.resolve(&issued.token).await.unwrap(),
            Resolution::Expired(_)
        ));
        assert_eq!(f.store.session_count().await, 0);
        assert!(matches!(
            f.manager.resolve(&issued.token).await.unwrap(),
            Resolution::Unknown
        ));
    }

    #[tokio::test]
    async fn test_token_stored_hashed() {
        let f = fixture(ConcurrencyPolicy::Allow).await;
        let issued = f.manager.issue(&f.user, &ClientFingerprint::default()).await.unwrap();
        assert_ne!(issued.session.token_hash, issued.token);
        assert_eq!(issued.session.token_hash.len(), 64);
        assert!(SessionStore::find(&*f.store, &issued.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_single_policy_preempts() {
        let f = fixture(ConcurrencyPolicy::Single).await;
        let first = f.manager.issue(&f.user, &ClientFingerprint::default()).await.unwrap();
        let second = f.manager.issue(&f.user, &ClientFingerprint::default()).await.unwrap();

        assert_eq!(second.preempted.len(), 1);
        assert_eq!(second.preempted[0].token_hash, first.session.token_hash);
        assert!(matches!(
            f.manager.resolve(&first.token).await.unwrap(),
            Resolution::Unknown
        ));
    }

    #[tokio::test]
    async fn test_deactivated_user_revoked() {
        let f = fixture(ConcurrencyPolicy::Allow).await;
        let issued = f.manager.issue(&f.user, &ClientFingerprint::default()).await.unwrap();
        f.store.set_active(f.user.id, false).await.unwrap();
        assert!(matches!(
            f.manager.resolve(&issued.token).await.unwrap(),
            Resolution::Revoked(_)
        ));
        assert_eq!(f.store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_status_does_not_extend() {
        let f = fixture(ConcurrencyPolicy::Allow).await;
        let issued = f.manager.issue(&f.user, &ClientFingerprint::default()).await.unwrap();
        f.clock.advance(Duration::minutes(26));

        let status = f.manager.status(&issued.token).await.unwrap().unwrap();
        assert_eq!(status.seconds_remaining, 4 * 60);
        assert!(status.warning);
        assert_eq!(status.expires_at, issued.session.expiry);
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let f = fixture(ConcurrencyPolicy::Allow).await;
        f.manager.issue(&f.user, &ClientFingerprint::default()).await.unwrap();
        f.clock.advance(Duration::hours(1));
        assert_eq!(f.manager.sweep_expired().await.unwrap().len(), 1);
    }
}
