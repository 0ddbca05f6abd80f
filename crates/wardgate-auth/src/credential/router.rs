//! Realm router: picks the credential verifier by request path.

use std::sync::Arc;

use tracing::{info, warn};

use wardgate_core::result::AppResult;
use wardgate_core::traits::Clock;
use wardgate_entity::user::User;

use super::failures::{FailureKey, FailureTracker};
use super::verifier::{AuthFailure, CredentialVerifier, Realm, Verification};
use crate::password::PasswordHasher;

/// Outcome of one authentication attempt through the router.
#[derive(Debug, Clone)]
pub struct AuthAttempt {
    /// Realm the attempt was routed to.
    pub realm: Realm,
    /// Verifier outcome.
    pub outcome: Verification,
    /// Failures recorded for this identifier within the tracker window,
    /// including this one. Zero on success.
    pub recent_failures: usize,
}

impl AuthAttempt {
    /// The authenticated user, if the attempt succeeded.
    pub fn user(&self) -> Option<&User> {
        self.outcome.verified()
    }
}

/// Routes credentials to the admin or application verifier.
///
/// A path under the admin prefix always goes to the admin verifier and
/// every other path to the application verifier. There is no fallback.
#[derive(Clone)]
pub struct RealmRouter {
    admin_prefix: String,
    admin: Arc<dyn CredentialVerifier>,
    application: Arc<dyn CredentialVerifier>,
    hasher: PasswordHasher,
    failures: Arc<FailureTracker>,
    clock: Arc<dyn Clock>,
}

impl RealmRouter {
    pub fn new(
        admin_prefix: impl Into<String>,
        admin: Arc<dyn CredentialVerifier>,
        application: Arc<dyn CredentialVerifier>,
        hasher: PasswordHasher,
        failures: Arc<FailureTracker>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            admin_prefix: admin_prefix.into(),
            admin,
            application,
            hasher,
            failures,
            clock,
        }
    }

    /// Realm for a request path.
    pub fn realm_for_path(&self, path: &str) -> Realm {
        if path.starts_with(&self.admin_prefix) {
            Realm::Admin
        } else {
            Realm::Application
        }
    }

    /// Whether `path` lies under the admin prefix.
    pub fn is_admin_path(&self, path: &str) -> bool {
        self.realm_for_path(path) == Realm::Admin
    }

    pub fn admin_prefix(&self) -> &str {
        &self.admin_prefix
    }

    pub fn failures(&self) -> &Arc<FailureTracker> {
        &self.failures
    }

    /// Verify credentials against the verifier for `realm`.
    ///
    /// Failures are counted against the identifier. The password is never
    /// logged.
    pub async fn authenticate(
        &self,
        realm: Realm,
        identifier: &str,
        password: &str,
    ) -> AppResult<AuthAttempt> {
        let identifier = identifier.trim();
        let outcome = if identifier.is_empty() || password.is_empty() {
            self.hasher.dummy_verify(password);
            Verification::Rejected {
                user: None,
                reason: AuthFailure::NoCredentials,
            }
        } else {
            let verifier = match realm {
                Realm::Admin => &self.admin,
                Realm::Application => &self.application,
            };
            verifier.verify(identifier, password).await?
        };

        let recent_failures = match &outcome {
            Verification::Verified(user) => {
                info!(
                    realm = %realm,
                    identifier = identifier,
                    user_id = %user.id,
                    "Authentication succeeded"
                );
                0
            }
            Verification::Rejected { user, reason } => {
                let count = if identifier.is_empty() {
                    0
                } else {
                    self.failures.record(
                        FailureKey::Identifier(identifier.to_string()),
                        self.clock.now(),
                    )
                };
                warn!(
                    realm = %realm,
                    identifier = identifier,
                    user_id = ?user.as_ref().map(|u| u.id),
                    reason = %reason,
                    recent_failures = count,
                    "Authentication failed"
                );
                count
            }
        };

        Ok(AuthAttempt {
            realm,
            outcome,
            recent_failures,
        })
    }
}
