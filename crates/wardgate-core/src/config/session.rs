//! Session management configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session management configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle time after which a session is no longer resolvable.
    #[serde(default = "default_idle_timeout", with = "super::duration")]
    pub idle_timeout: Duration,
    /// What happens to existing sessions when a user signs in again.
    #[serde(default)]
    pub concurrency: ConcurrencyPolicy,
    /// Remaining lifetime below which the session status reports a warning.
    #[serde(default = "default_warning_threshold", with = "super::duration")]
    pub warning_threshold: Duration,
    /// Interval of the background sweep that purges expired sessions.
    #[serde(default = "default_sweep_interval", with = "super::duration")]
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: default_idle_timeout(),
            concurrency: ConcurrencyPolicy::default(),
            warning_threshold: default_warning_threshold(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// Concurrent-login policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// Any number of live sessions per user.
    #[default]
    Allow,
    /// A new login preempts every older session of the same user.
    Single,
}

impl std::fmt::Display for ConcurrencyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConcurrencyPolicy::Allow => write!(f, "allow"),
            ConcurrencyPolicy::Single => write!(f, "single"),
        }
    }
}

fn default_idle_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_warning_threshold() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(5 * 60)
}
