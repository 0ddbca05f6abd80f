//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from,
//! in increasing precedence: `config/default.toml`, `config/<env>.toml`,
//! `WARDGATE__SECTION__KEY` environment variables, and finally the flat
//! operator-facing variables listed in [`FLAT_ENV_VARS`] (for example
//! `SESSION_IDLE_TIMEOUT=45m`).

pub mod activity;
pub mod app;
pub mod auth;
pub mod database;
pub mod detector;
pub mod duration;
pub mod logging;
pub mod rbac;
pub mod session;

use serde::{Deserialize, Serialize};

pub use self::activity::ActivityConfig;
pub use self::app::ServerConfig;
pub use self::auth::{AuthConfig, PasswordScheme};
pub use self::database::{DatabaseConfig, StorageBackend};
pub use self::detector::DetectorConfig;
pub use self::logging::LoggingConfig;
pub use self::rbac::{CacheStrategy, RbacConfig};
pub use self::session::{ConcurrencyPolicy, SessionConfig};

use crate::error::AppError;
use crate::result::AppResult;

/// Flat environment variables and the configuration key each one sets.
pub const FLAT_ENV_VARS: &[(&str, &str)] = &[
    ("ADMIN_PATH_PREFIX", "auth.admin_path_prefix"),
    ("PASSWORD_MIN_LENGTH", "auth.password_min_length"),
    ("PASSWORD_MIN_STRENGTH", "auth.password_min_strength"),
    ("PASSWORD_SCHEME", "auth.password_scheme"),
    ("SESSION_IDLE_TIMEOUT", "session.idle_timeout"),
    ("SESSION_CONCURRENCY", "session.concurrency"),
    ("SESSION_WARNING_THRESHOLD", "session.warning_threshold"),
    ("SESSION_SWEEP_INTERVAL", "session.sweep_interval"),
    ("BUSINESS_HOURS_START", "detector.business_hours_start"),
    ("BUSINESS_HOURS_END", "detector.business_hours_end"),
    (
        "BUSINESS_HOURS_UTC_OFFSET",
        "detector.business_hours_utc_offset_minutes",
    ),
    ("FAILED_LOGIN_THRESHOLD", "detector.failed_login_threshold"),
    ("FAILED_LOGIN_WINDOW", "detector.failed_login_window"),
    ("HIGH_FREQ_THRESHOLD", "detector.high_freq_threshold"),
    ("HIGH_FREQ_WINDOW", "detector.high_freq_window"),
    ("BULK_OPERATION_THRESHOLD", "detector.bulk_operation_threshold"),
    ("ALERT_COOLDOWN", "detector.cooldown"),
    ("RBAC_CACHE_STRATEGY", "rbac.cache_strategy"),
    ("RBAC_MAX_DEPTH", "rbac.max_depth"),
    ("REQUEST_DEADLINE", "server.request_deadline"),
    ("COOKIE_SECURE", "server.cookie_secure"),
    ("DATABASE_URL", "database.url"),
];

/// Flat environment variables holding comma-separated lists.
pub const FLAT_ENV_LISTS: &[(&str, &str)] = &[
    ("ACTIVITY_SKIP_PREFIXES", "activity.skip_prefixes"),
    ("ACTIVITY_SKIP_SUFFIXES", "activity.skip_suffixes"),
    ("DETECTOR_DISABLED_RULES", "detector.disabled_rules"),
    ("TRUSTED_PROXIES", "server.trusted_proxies"),
];

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Authentication settings.
    pub auth: AuthConfig,
    /// Session management settings.
    pub session: SessionConfig,
    /// Role graph and permission cache settings.
    pub rbac: RbacConfig,
    /// Activity recorder settings.
    pub activity: ActivityConfig,
    /// Anomaly detector settings.
    pub detector: DetectorConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `base_path` (without extension), the
    /// `config/<env>` overlay, and the process environment.
    pub fn load(base_path: &str, env: &str) -> AppResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(base_path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("WARDGATE")
                    .separator("__")
                    .try_parsing(true),
            );

        let builder = apply_flat_env(builder, |name| std::env::var(name).ok())?;

        let config: Self = builder
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> AppResult<()> {
        let prefix = &self.auth.admin_path_prefix;
        if !prefix.starts_with('/') || !prefix.ends_with('/') || prefix.len() < 2 {
            return Err(AppError::configuration(format!(
                "admin_path_prefix must look like '/segment/', got '{prefix}'"
            )));
        }

        if self.session.idle_timeout.is_zero() {
            return Err(AppError::configuration("session.idle_timeout must be positive"));
        }

        if let Some(bad) = self
            .server
            .trusted_proxies
            .iter()
            .find(|p| p.as_str() != "*" && p.parse::<std::net::IpAddr>().is_err())
        {
            return Err(AppError::configuration(format!(
                "server.trusted_proxies entries must be IP addresses or '*', got '{bad}'"
            )));
        }

        if self.rbac.max_depth == 0 {
            return Err(AppError::configuration("rbac.max_depth must be at least 1"));
        }

        if self.auth.password_min_strength > 4 {
            return Err(AppError::configuration(
                "auth.password_min_strength must be between 0 and 4",
            ));
        }

        if let Some((start, end)) = self.detector.business_hours() {
            if start > 23 || end > 24 || start >= end {
                return Err(AppError::configuration(format!(
                    "business hours must satisfy 0 <= start < end <= 24, got {start}..{end}"
                )));
            }
        }

        Ok(())
    }
}

/// Layer the flat operator variables on top of `builder`.
///
/// `lookup` resolves an environment variable name; it is a parameter so
/// that the mapping can be exercised without touching the process
/// environment.
pub fn apply_flat_env<F>(
    mut builder: config::ConfigBuilder<config::builder::DefaultState>,
    lookup: F,
) -> AppResult<config::ConfigBuilder<config::builder::DefaultState>>
where
    F: Fn(&str) -> Option<String>,
{
    for (var, key) in FLAT_ENV_VARS {
        if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
            builder = builder.set_override(*key, value.trim().to_string())?;
        }
    }

    for (var, key) in FLAT_ENV_LISTS {
        if let Some(value) = lookup(var) {
            let items: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            builder = builder.set_override(*key, items)?;
        }
    }

    Ok(builder)
}
