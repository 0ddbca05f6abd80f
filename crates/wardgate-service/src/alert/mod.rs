//! Operator-facing alert handling.

pub mod service;

pub use service::AlertService;
