//! Activity records, session summaries, alerts, and aggregate statistics.

pub mod alert;
pub mod record;
pub mod stats;
pub mod summary;

pub use alert::{ActivityAlert, AlertKind, AlertSeverity, NewAlert};
pub use record::{ActionKind, ActivityLevel, ActivityRecord, NewActivityRecord};
pub use stats::{ActivityStatistics, StatsRange, UserActivityCount};
pub use summary::{SessionSummary, SummaryTouch};
