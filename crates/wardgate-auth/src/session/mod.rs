//! Session lifecycle: opaque tokens, idle timeout, and concurrency policy.

pub mod manager;
pub mod token;

pub use manager::{IssuedSession, Resolution, SessionManager, SessionStatus};
pub use token::{generate_token, sha256_hex};
