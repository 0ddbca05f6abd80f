//! Axum middleware stack.

pub mod interceptor;

pub use interceptor::intercept;
