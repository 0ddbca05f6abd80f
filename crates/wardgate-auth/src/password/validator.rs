//! Password policy enforcement for new passwords.

use wardgate_core::config::AuthConfig;
use wardgate_core::error::AppError;

/// Validates passwords against the configured length and strength floor.
#[derive(Debug, Clone)]
pub struct PasswordValidator {
    /// Minimum password length, in characters.
    min_length: usize,
    /// Minimum zxcvbn score (0 disables the check).
    min_strength: u8,
}

impl PasswordValidator {
    /// Creates a new validator from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            min_length: config.password_min_length,
            min_strength: config.password_min_strength.min(4),
        }
    }

    /// Validates a password. `user_inputs` (username, phone, ...) are
    /// penalized by the strength estimator.
    pub fn validate(&self, password: &str, user_inputs: &[&str]) -> Result<(), AppError> {
        if password.chars().count() < self.min_length {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters long",
                self.min_length
            )));
        }

        if let Some(floor) = score_floor(self.min_strength) {
            let estimate = zxcvbn::zxcvbn(password, user_inputs);
            if estimate.score() < floor {
                return Err(AppError::validation(
                    "Password is too weak. Please use a stronger password with more entropy.",
                ));
            }
        }

        Ok(())
    }
}

fn score_floor(strength: u8) -> Option<zxcvbn::Score> {
    match strength {
        0 => None,
        1 => Some(zxcvbn::Score::One),
        2 => Some(zxcvbn::Score::Two),
        3 => Some(zxcvbn::Score::Three),
        _ => Some(zxcvbn::Score::Four),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(min_length: usize, min_strength: u8) -> PasswordValidator {
        PasswordValidator::new(&AuthConfig {
            password_min_length: min_length,
            password_min_strength: min_strength,
            ..AuthConfig::default()
        })
    }

    #[test]
    fn test_min_length() {
        let v = validator(8, 0);
        assert!(v.validate("short", &[]).is_err());
        assert!(v.validate("long enough", &[]).is_ok());
    }

    #[test]
    fn test_length_counts_characters() {
        let v = validator(4, 0);
        assert!(v.validate("ñññ", &[]).is_err());
        assert!(v.validate("ññññ", &[]).is_ok());
    }

    #[test]
    fn test_strength_floor() {
        let v = validator(1, 3);
        assert!(v.validate("password", &[]).is_err());
        assert!(v.validate("correct-horse-battery-staple-42!", &[]).is_ok());
    }
}
