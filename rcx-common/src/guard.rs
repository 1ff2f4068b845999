//! Bounded execution of remote-facing calls.
//!
//! Each call gets its own deadline via `tokio::time::timeout`, so independent
//! runs never share cancellation state and a timed-out call releases its
//! timer on every exit path (the timeout future is simply dropped). The guard
//! never retries; retry policy belongs to callers.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::session::SessionError;

/// Outcome of a guarded call that did not succeed.
#[derive(Debug, Clone, Error)]
pub enum GuardError {
    /// The budget elapsed before the operation resolved. The remote side may
    /// still be running; from the caller's perspective the call is abandoned.
    #[error("operation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The wrapped operation itself failed; propagated unchanged.
    #[error(transparent)]
    Inner(#[from] SessionError),
}

impl GuardError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Run `op` with a hard deadline of `budget`.
pub async fn bounded<T, F>(budget: Duration, op: F) -> Result<T, GuardError>
where
    F: Future<Output = Result<T, SessionError>>,
{
    match tokio::time::timeout(budget, op).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(GuardError::Inner(err)),
        Err(_elapsed) => Err(GuardError::Timeout(budget)),
    }
}
