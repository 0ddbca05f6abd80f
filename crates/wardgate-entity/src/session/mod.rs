//! Session entity and related value types.

pub mod model;

pub use model::{ClientFingerprint, EndReason, Session};
