//! Errors surfaced by guarded calls and registry lookups.

use std::time::Duration;

use thiserror::Error;

use crate::resilience::status::CircuitState;

/// Failure of a call made through a circuit breaker.
///
/// The wrapped error of `Failed` is always the one `work` returned.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The circuit is open (or a half-open trial is already running); `work` was not invoked.
    #[error("circuit breaker '{service}' is open, retry after {retry_after:?}")]
    Open { service: String, retry_after: Duration },

    /// `work` exceeded the call timeout and was abandoned.
    #[error("call through circuit breaker '{service}' timed out after {timeout:?}")]
    Timeout { service: String, timeout: Duration },

    /// `work` returned an error.
    #[error("call through circuit breaker '{service}' failed (circuit {state}): {inner}")]
    Failed {
        service: String,
        state: CircuitState,
        inner: E,
    },

    /// Blocking work was cancelled before it produced a result.
    #[error("call through circuit breaker '{service}' was interrupted")]
    Interrupted { service: String },
}

impl<E> BreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BreakerError::Timeout { .. })
    }

    /// Suggested wait before retrying, for rejections only.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            BreakerError::Open { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    /// The error returned by `work`, if it got that far.
    pub fn into_inner(self) -> Option<E> {
        match self {
            BreakerError::Failed { inner, .. } => Some(inner),
            _ => None,
        }
    }
}

/// Administrative lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("circuit breaker not found: {0}")]
    NotFound(String),
}
