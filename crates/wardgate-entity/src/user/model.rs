//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use wardgate_core::types::UserId;

/// A person who can authenticate in either realm.
///
/// Admin-realm logins identify the user by `username`, application-realm
/// logins by `phone`. Both are required and unique.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Admin-realm login name.
    pub username: String,
    /// Application-realm login, digits only.
    pub phone: String,
    /// Email address (unique when set).
    pub email: Option<String>,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Password verifier with its scheme identifier embedded.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Deactivated users keep their row but can no longer sign in.
    pub is_active: bool,
    /// May use the admin console.
    pub is_staff: bool,
    /// Holds every permission unconditionally.
    pub is_superuser: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// Last successful login.
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// First and last name joined, if either is set.
    pub fn full_name(&self) -> Option<String> {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            None
        } else {
            Some(full.to_string())
        }
    }

    /// Name to show in UIs: the full name, falling back to the username.
    pub fn display_name(&self) -> String {
        self.full_name().unwrap_or_else(|| self.username.clone())
    }
}

/// Data required to create a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    /// Desired username.
    pub username: String,
    /// Phone number (digits).
    pub phone: String,
    /// Email address (optional).
    pub email: Option<String>,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Pre-hashed password.
    pub password_hash: String,
    /// Initial active flag.
    pub is_active: bool,
    /// Initial staff flag.
    pub is_staff: bool,
    /// Initial superuser flag.
    pub is_superuser: bool,
}

/// Profile changes applied by an update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserChanges {
    /// New given name.
    pub first_name: Option<String>,
    /// New family name.
    pub last_name: Option<String>,
    /// New email; `Some(None)` clears it.
    pub email: Option<Option<String>>,
}

impl UserChanges {
    /// Whether the change set touches nothing.
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        User {
            id: UserId(1),
            username: "nurse.joy".to_string(),
            phone: "08011112222".to_string(),
            email: None,
            first_name: first.to_string(),
            last_name: last.to_string(),
            password_hash: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        assert_eq!(user("Joy", "Smith").display_name(), "Joy Smith");
        assert_eq!(user("Joy", "").display_name(), "Joy");
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        assert_eq!(user(" ", "").display_name(), "nurse.joy");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let mut u = user("Joy", "Smith");
        u.password_hash = "$argon2id$secret".to_string();
        let json = serde_json::to_string(&u).expect("serialize");
        assert!(!json.contains("argon2id"));
    }
}
