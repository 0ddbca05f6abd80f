//! # wardgate-api
//!
//! HTTP layer for Wardgate built on Axum.
//!
//! Every request passes through one interceptor
//! ([`middleware::interceptor`]) that resolves the session, asks the
//! authorization gate, runs the handler under the request deadline, and
//! hands the outcome to the activity recorder and the anomaly detector.

pub mod app;
pub mod cookies;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod operations;
pub mod router;
pub mod state;

pub use app::{build_app, run_server, serve};
pub use error::{ApiError, ApiErrorResponse};
pub use state::AppState;
