//! Password hashing and verification.
//!
//! New hashes use the configured scheme. Verification detects the scheme
//! from the stored string: a PHC string (`$argon2id$...`) or a bcrypt
//! string (`$2b$...`), so both kinds can coexist while users migrate.

use std::sync::{Arc, OnceLock};

use argon2::{
    Argon2, Params,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use wardgate_core::config::PasswordScheme;
use wardgate_core::error::AppError;

/// Prefixes identifying bcrypt hashes.
const BCRYPT_PREFIXES: &[&str] = &["$2a$", "$2b$", "$2x$", "$2y$"];

/// Handles password hashing and verification.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    scheme: PasswordScheme,
    bcrypt_cost: u32,
    /// Hash verified against when the identifier is unknown.
    dummy: Arc<OnceLock<String>>,
}

impl PasswordHasher {
    /// Creates a hasher producing `scheme` hashes.
    pub fn new(scheme: PasswordScheme) -> Self {
        Self {
            scheme,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            dummy: Arc::new(OnceLock::new()),
        }
    }

    /// Override the bcrypt work factor (4..=31).
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost.clamp(4, 31);
        self
    }

    /// Scheme used for new hashes.
    pub fn scheme(&self) -> PasswordScheme {
        self.scheme
    }

    /// Hashes a plaintext password with the configured scheme.
    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        match self.scheme {
            PasswordScheme::Argon2id => {
                let salt = SaltString::generate(&mut OsRng);
                Argon2::default()
                    .hash_password(password.as_bytes(), &salt)
                    .map(|hash| hash.to_string())
                    .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))
            }
            PasswordScheme::Bcrypt => bcrypt::hash(password, self.bcrypt_cost)
                .map_err(|e| AppError::internal(format!("Password hashing failed: {e}"))),
        }
    }

    /// Verifies a plaintext password against a stored hash of either scheme.
    ///
    /// Returns `Ok(false)` for a mismatch and an error only for a stored
    /// value that is not a recognizable hash.
    pub fn verify_password(&self, password: &str, stored: &str) -> Result<bool, AppError> {
        if is_bcrypt(stored) {
            return bcrypt::verify(password, stored)
                .map_err(|e| AppError::internal(format!("Password verification failed: {e}")));
        }

        let parsed = PasswordHash::new(stored)
            .map_err(|e| AppError::internal(format!("Invalid password hash format: {e}")))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::internal(format!(
                "Password verification failed: {e}"
            ))),
        }
    }

    /// Whether `stored` should be replaced by a fresh hash: it uses another
    /// scheme, or weaker parameters than the current defaults.
    pub fn needs_rehash(&self, stored: &str) -> bool {
        match self.scheme {
            PasswordScheme::Bcrypt => match bcrypt_cost(stored) {
                Some(cost) => cost < self.bcrypt_cost,
                None => true,
            },
            PasswordScheme::Argon2id => {
                let Ok(parsed) = PasswordHash::new(stored) else {
                    return true;
                };
                if parsed.algorithm.as_str() != "argon2id" {
                    return true;
                }
                match Params::try_from(&parsed) {
                    Ok(params) => {
                        let target = Params::default();
                        params.m_cost() < target.m_cost()
                            || params.t_cost() < target.t_cost()
                            || params.p_cost() < target.p_cost()
                    }
                    Err(_) => true,
                }
            }
        }
    }

    /// Spend one verification on a throwaway hash so that an unknown
    /// identifier costs as much as a wrong password.
    pub fn dummy_verify(&self, password: &str) {
        if self.dummy.get().is_none() {
            match self.hash_password("wardgate-timing-equalizer") {
                Ok(hash) => {
                    let _ = self.dummy.set(hash);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Could not build timing-equalizer hash");
                    return;
                }
            }
        }
        if let Some(hash) = self.dummy.get() {
            let _ = self.verify_password(password, hash);
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(PasswordScheme::default())
    }
}

fn is_bcrypt(stored: &str) -> bool {
    BCRYPT_PREFIXES.iter().any(|p| stored.starts_with(p))
}

/// Work factor of a bcrypt hash (`$2b$12$...` → 12).
fn bcrypt_cost(stored: &str) -> Option<u32> {
    if !is_bcrypt(stored) {
        return None;
    }
    stored.get(4..6)?.parse().ok()
}
