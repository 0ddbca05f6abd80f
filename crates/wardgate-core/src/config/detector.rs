//! Anomaly detector configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Anomaly detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// First business hour (inclusive). The unusual-access-time rule is
    /// active only when both bounds are set.
    #[serde(default)]
    pub business_hours_start: Option<u32>,
    /// Last business hour (exclusive).
    #[serde(default)]
    pub business_hours_end: Option<u32>,
    /// Offset from UTC, in minutes, of the business-hours clock.
    #[serde(default)]
    pub business_hours_utc_offset_minutes: i32,
    /// Failed authentications per identifier or IP that raise an alert.
    #[serde(default = "default_failed_login_threshold")]
    pub failed_login_threshold: u32,
    /// Window over which failed authentications are counted.
    #[serde(default = "default_failed_login_window", with = "super::duration")]
    pub failed_login_window: Duration,
    /// Requests per session above which an alert is raised.
    #[serde(default = "default_high_freq_threshold")]
    pub high_freq_threshold: u32,
    /// Window over which per-session requests are counted.
    #[serde(default = "default_high_freq_window", with = "super::duration")]
    pub high_freq_window: Duration,
    /// Records touched by one operation that count as a bulk operation.
    #[serde(default = "default_bulk_operation_threshold")]
    pub bulk_operation_threshold: u64,
    /// Minimum interval between two alerts of one rule for one subject.
    #[serde(default = "default_cooldown", with = "super::duration")]
    pub cooldown: Duration,
    /// Rule names that never fire.
    #[serde(default)]
    pub disabled_rules: Vec<String>,
}

impl DetectorConfig {
    /// The configured business-hours window, if both bounds are present.
    pub fn business_hours(&self) -> Option<(u32, u32)> {
        match (self.business_hours_start, self.business_hours_end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// Whether the rule with the given name is enabled.
    pub fn rule_enabled(&self, rule: &str) -> bool {
        !self
            .disabled_rules
            .iter()
            .any(|r| r.trim().eq_ignore_ascii_case(rule))
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            business_hours_start: None,
            business_hours_end: None,
            business_hours_utc_offset_minutes: 0,
            failed_login_threshold: default_failed_login_threshold(),
            failed_login_window: default_failed_login_window(),
            high_freq_threshold: default_high_freq_threshold(),
            high_freq_window: default_high_freq_window(),
            bulk_operation_threshold: default_bulk_operation_threshold(),
            cooldown: default_cooldown(),
            disabled_rules: Vec::new(),
        }
    }
}

fn default_failed_login_threshold() -> u32 {
    5
}

fn default_failed_login_window() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_high_freq_threshold() -> u32 {
    300
}

fn default_high_freq_window() -> Duration {
    Duration::from_secs(60)
}

fn default_bulk_operation_threshold() -> u64 {
    50
}

fn default_cooldown() -> Duration {
    Duration::from_secs(60 * 60)
}
