//! Session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use wardgate_core::types::UserId;

/// A live authenticated session.
///
/// The plaintext token is never stored: `token_hash` is the lowercase hex
/// SHA-256 of the token handed to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// SHA-256 of the session token.
    pub token_hash: String,
    /// Owning user.
    pub user_id: UserId,
    /// When the session was issued.
    pub created_at: DateTime<Utc>,
    /// Last time the session was resolved.
    pub last_activity: DateTime<Utc>,
    /// Instant after which the session is no longer resolvable.
    pub expiry: DateTime<Utc>,
    /// Client IP at issue time.
    pub ip_address: Option<String>,
    /// SHA-256 of the client User-Agent at issue time.
    pub user_agent_hash: Option<String>,
}

impl Session {
    /// Whether the session has expired at `now`.
    ///
    /// The boundary instant itself is still valid.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry
    }

    /// Seconds left before expiry at `now`, clamped at zero.
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.expiry - now).num_seconds().max(0)
    }
}

/// What the server knows about the client that opened a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFingerprint {
    /// Client IP address.
    pub ip: Option<String>,
    /// Raw User-Agent header.
    pub user_agent: Option<String>,
}

text_enum! {
    /// Why a session ended.
    EndReason as "session_end_reason" {
        /// The user logged out.
        Manual => "manual",
        /// The idle timeout elapsed.
        Inactivity => "inactivity",
        /// Revoked by an administrative action (deactivation, privilege change).
        Security => "security",
        /// Preempted by a newer login of the same user.
        Concurrent => "concurrent",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expiry: DateTime<Utc>) -> Session {
        Session {
            token_hash: "abc".to_string(),
            user_id: UserId(1),
            created_at: expiry - Duration::minutes(30),
            last_activity: expiry - Duration::minutes(30),
            expiry,
            ip_address: None,
            user_agent_hash: None,
        }
    }

    #[test]
    fn test_expiry_boundary_inclusive() {
        let expiry = Utc::now();
        let s = session(expiry);
        assert!(!s.is_expired_at(expiry));
        assert!(s.is_expired_at(expiry + Duration::seconds(1)));
    }

    #[test]
    fn test_seconds_remaining_clamped() {
        let expiry = Utc::now();
        let s = session(expiry);
        assert_eq!(s.seconds_remaining(expiry - Duration::seconds(90)), 90);
        assert_eq!(s.seconds_remaining(expiry + Duration::seconds(5)), 0);
    }

    #[test]
    fn test_end_reason_parse() {
        assert_eq!("inactivity".parse::<EndReason>().unwrap(), EndReason::Inactivity);
        assert_eq!("MANUAL".parse::<EndReason>().unwrap(), EndReason::Manual);
        assert!("timeout".parse::<EndReason>().is_err());
    }
}
