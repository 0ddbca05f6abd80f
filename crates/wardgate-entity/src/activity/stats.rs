//! Aggregate activity statistics for operator dashboards.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use wardgate_core::AppError;
use wardgate_core::types::UserId;

/// Look-back window for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StatsRange {
    #[serde(rename = "1d")]
    Day,
    #[default]
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
}

impl StatsRange {
    /// Length of the window.
    pub fn duration(&self) -> Duration {
        match self {
            Self::Day => Duration::days(1),
            Self::Week => Duration::days(7),
            Self::Month => Duration::days(30),
            Self::Quarter => Duration::days(90),
        }
    }

    /// Start of the window ending at `now`.
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }
}

impl FromStr for StatsRange {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(Self::Day),
            "7d" => Ok(Self::Week),
            "30d" => Ok(Self::Month),
            "90d" => Ok(Self::Quarter),
            other => Err(AppError::validation(format!(
                "Invalid range '{other}'. Expected one of: 1d, 7d, 30d, 90d"
            ))),
        }
    }
}

/// Activity count for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivityCount {
    pub user_id: UserId,
    pub count: u64,
}

/// Counts over a time window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityStatistics {
    /// Start of the window.
    pub since: Option<DateTime<Utc>>,
    /// Records in the window.
    pub total: u64,
    /// Records classified as `error`.
    pub errors: u64,
    /// Records per level.
    pub by_level: BTreeMap<String, u64>,
    /// Records per module.
    pub by_module: BTreeMap<String, u64>,
    /// The ten most active users.
    pub top_users: Vec<UserActivityCount>,
    /// Alerts still open (all time).
    pub open_alerts: u64,
}
