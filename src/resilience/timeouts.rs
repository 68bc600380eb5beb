//! Deadline enforcement for guarded work.
//!
//! Work that misses its deadline is abandoned: async work is dropped at
//! the next await point, blocking work keeps its thread but its result is
//! discarded.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinError;
use tokio::time::error::Elapsed;

/// Run `fut` with a deadline.
pub async fn with_deadline<F>(limit: Duration, fut: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    tokio::time::timeout(limit, fut).await
}

/// Run a synchronous closure on the blocking pool with a deadline.
///
/// The inner `JoinError` reports a panic or a runtime-initiated cancellation.
pub async fn blocking_with_deadline<F, T>(
    limit: Duration,
    work: F,
) -> Result<Result<T, JoinError>, Elapsed>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(work);
    tokio::time::timeout(limit, handle).await
}
