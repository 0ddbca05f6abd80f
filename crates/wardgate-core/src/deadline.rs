//! Per-request deadline helper.
//!
//! Every store call made on the request path runs under a deadline. An
//! elapsed deadline surfaces as [`ErrorKind::Timeout`](crate::ErrorKind),
//! which callers on the authorization path treat as a denial.

use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::result::AppResult;

/// Run `fut` under `deadline`, abandoning it when the deadline elapses.
pub async fn with_deadline<T, F>(deadline: Duration, operation: &str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                operation = operation,
                deadline_ms = deadline.as_millis() as u64,
                "Operation abandoned at deadline"
            );
            Err(AppError::timeout(format!(
                "{operation} exceeded deadline of {}ms",
                deadline.as_millis()
            )))
        }
    }
}
