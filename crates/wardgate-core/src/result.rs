//! Convenience result type alias for Wardgate.

use crate::error::AppError;

/// A specialized `Result` type for Wardgate operations.
pub type AppResult<T> = Result<T, AppError>;
