//! # wardgate-core
//!
//! Core crate for Wardgate. Contains configuration schemas, typed
//! identifiers, pagination types, the clock abstraction used by every
//! time-dependent component, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Wardgate crates.

pub mod config;
pub mod deadline;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
