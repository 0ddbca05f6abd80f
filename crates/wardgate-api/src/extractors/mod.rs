//! Custom Axum extractors.

pub mod caller;
pub mod client;
pub mod login;
pub mod pagination;

pub use caller::{ActivityHandled, Caller};
pub use client::{TrustedProxies, client_fingerprint, wants_json};
pub use login::LoginPayload;
pub use pagination::PaginationParams;
