//! Per-realm credential verifiers.
//!
//! Admin logins identify the user by username and require `is_staff`;
//! application logins identify the user by phone. A verifier never tells
//! its caller whether the identifier existed: both outcomes are a
//! [`Verification::Rejected`], and an unknown identifier still pays for
//! one hash verification.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use wardgate_core::result::AppResult;
use wardgate_database::store::UserStore;
use wardgate_entity::user::User;

use crate::password::PasswordHasher;

/// Authentication domain, distinguished by the user column that
/// identifies the principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Realm {
    /// Admin console, identified by username.
    Admin,
    /// Application, identified by phone.
    Application,
}

impl Realm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Application => "application",
        }
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Internal failure kind. Never shown to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailure {
    /// Identifier or password missing.
    NoCredentials,
    /// Unknown identifier or wrong password.
    BadCredentials,
    /// Correct password for a deactivated account.
    Inactive,
    /// Correct password, but the account may not use this realm.
    WrongRealm,
}

impl AuthFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoCredentials => "no_credentials",
            Self::BadCredentials => "bad_credentials",
            Self::Inactive => "inactive",
            Self::WrongRealm => "wrong_realm",
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a credential check.
#[derive(Debug, Clone)]
pub enum Verification {
    Verified(User),
    /// `user` is set when the identifier resolved to a user.
    Rejected {
        user: Option<User>,
        reason: AuthFailure,
    },
}

impl Verification {
    /// The authenticated user, if any.
    pub fn verified(&self) -> Option<&User> {
        match self {
            Self::Verified(user) => Some(user),
            Self::Rejected { .. } => None,
        }
    }
}

/// Verifies an (identifier, password) pair for one realm.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    fn realm(&self) -> Realm;

    async fn verify(&self, identifier: &str, password: &str) -> AppResult<Verification>;
}

/// Shared lookup-then-verify logic.
async fn check_password(
    hasher: &PasswordHasher,
    found: Option<User>,
    password: &str,
) -> AppResult<Result<User, Verification>> {
    let Some(user) = found else {
        hasher.dummy_verify(password);
        return Ok(Err(Verification::Rejected {
            user: None,
            reason: AuthFailure::BadCredentials,
        }));
    };

    if !hasher.verify_password(password, &user.password_hash)? {
        return Ok(Err(Verification::Rejected {
            user: Some(user),
            reason: AuthFailure::BadCredentials,
        }));
    }
    if !user.is_active {
        return Ok(Err(Verification::Rejected {
            user: Some(user),
            reason: AuthFailure::Inactive,
        }));
    }
    Ok(Ok(user))
}

/// Admin-console verifier: username lookup, staff only.
#[derive(Clone)]
pub struct AdminVerifier {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
}

impl AdminVerifier {
    pub fn new(users: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        Self { users, hasher }
    }
}

#[async_trait]
impl CredentialVerifier for AdminVerifier {
    fn realm(&self) -> Realm {
        Realm::Admin
    }

    async fn verify(&self, identifier: &str, password: &str) -> AppResult<Verification> {
        let found = self.users.find_by_username(identifier).await?;
        match check_password(&self.hasher, found, password).await? {
            Ok(user) if !user.is_staff => Ok(Verification::Rejected {
                user: Some(user),
                reason: AuthFailure::WrongRealm,
            }),
            Ok(user) => Ok(Verification::Verified(user)),
            Err(rejected) => Ok(rejected),
        }
    }
}

/// Application verifier: phone lookup, any active user.
#[derive(Clone)]
pub struct AppVerifier {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
}

impl AppVerifier {
    pub fn new(users: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        Self { users, hasher }
    }
}

#[async_trait]
impl CredentialVerifier for AppVerifier {
    fn realm(&self) -> Realm {
        Realm::Application
    }

    async fn verify(&self, identifier: &str, password: &str) -> AppResult<Verification> {
        let found = self.users.find_by_phone(identifier).await?;
        Ok(match check_password(&self.hasher, found, password).await? {
            Ok(user) => Verification::Verified(user),
            Err(rejected) => rejected,
        })
    }
}
