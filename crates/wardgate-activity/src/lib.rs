//! # wardgate-activity
//!
//! Per-request activity capture, anomaly detection, and the audit log.
//!
//! None of these components fail their caller: persistence errors are
//! logged through `tracing` and, for the audit log, raised as a
//! `system_error` alert.

pub mod audit;
pub mod classify;
pub mod detector;
pub mod recorder;
pub mod skip;

pub use audit::AuditWriter;
pub use classify::{Classification, classify};
pub use detector::{AnomalyDetector, RequestObservation};
pub use recorder::{ActivityRecorder, RequestActivity};
pub use skip::SkipSet;
