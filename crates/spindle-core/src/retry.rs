//! Retry executor: runs storage operations with a fixed attempt budget.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::domain::StoreError;

/// Fixed-budget retry wrapper used uniformly by every façade operation.
///
/// The wrapper knows nothing about operation semantics, so everything pushed
/// through it must be safe to re-apply after a half-applied failure: inserts
/// with caller-assigned keys and predicate-based updates are, increments
/// would not be.
///
/// A call blocks the caller for up to `(max_attempts - 1) * interval` of
/// sleep before giving up; callers needing cancellation enforce it around
/// the call.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    max_attempts: u32,
    interval: Duration,
}

impl Default for RetryExecutor {
    /// The persistence default: 3 attempts, 100 ms apart.
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

impl RetryExecutor {
    /// # Panics
    /// `max_attempts` must be at least 1.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        assert!(max_attempts >= 1, "retry budget must allow one attempt");
        Self {
            max_attempts,
            interval,
        }
    }

    /// Invoke `op`; on failure retry up to the attempt budget with the fixed
    /// delay in between, then propagate the last error.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "storage operation failed, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(self.interval).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn returns_first_success() {
        let executor = RetryExecutor::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result = executor
            .run(|| {
                calls.fetch_add(1, Ordering::Relaxed);
                async { Ok(42u32) }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn retries_until_success_within_budget() {
        let executor = RetryExecutor::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result = executor
            .run(|| {
                let n = calls.fetch_add(1, Ordering::Relaxed);
                async move {
                    if n < 2 {
                        Err(StoreError::Unavailable("flaky".into()))
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn propagates_last_error_after_budget() {
        let executor = RetryExecutor::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = executor
            .run(|| {
                let n = calls.fetch_add(1, Ordering::Relaxed) + 1;
                async move { Err(StoreError::Unavailable(format!("attempt {n}"))) }
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(&err, StoreError::Unavailable(msg) if msg == "attempt 3"));
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }
}
