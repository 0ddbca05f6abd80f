//! Authentication configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Path prefix that selects the admin realm (username login).
    #[serde(default = "default_admin_path_prefix")]
    pub admin_path_prefix: String,
    /// Minimum password length enforced by the password policy.
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,
    /// Minimum zxcvbn score (0-4). `0` disables the strength check.
    #[serde(default)]
    pub password_min_strength: u8,
    /// Hashing scheme used for new password verifiers.
    #[serde(default)]
    pub password_scheme: PasswordScheme,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_path_prefix: default_admin_path_prefix(),
            password_min_length: default_password_min_length(),
            password_min_strength: 0,
            password_scheme: PasswordScheme::default(),
        }
    }
}

/// Password hashing scheme identifier.
///
/// The identifier is also recoverable from a stored verifier, which is what
/// allows verifiers produced by an older scheme to keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PasswordScheme {
    /// Argon2id, PHC string format.
    #[default]
    Argon2id,
    /// bcrypt, `$2b$` modular crypt format.
    Bcrypt,
}

impl PasswordScheme {
    /// Return the identifier as stored in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Argon2id => "argon2id",
            Self::Bcrypt => "bcrypt",
        }
    }
}

impl fmt::Display for PasswordScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PasswordScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "argon2id" | "argon2" => Ok(Self::Argon2id),
            "bcrypt" => Ok(Self::Bcrypt),
            other => Err(format!("unknown password scheme: {other}")),
        }
    }
}

fn default_admin_path_prefix() -> String {
    "/admin/".to_string()
}

fn default_password_min_length() -> usize {
    8
}
