//! The login flow: authenticate, issue, resolve, and end sessions.

pub mod service;

pub use service::{AuthService, LoginOutcome};
