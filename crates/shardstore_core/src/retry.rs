//! Throttle-aware retry executor.
//!
//! # Responsibility
//! - Re-run store operations that fail with the transient throttle signal,
//!   honoring the server-supplied backoff.
//! - Propagate every other failure unchanged, with zero retries.
//!
//! # Invariants
//! - Retries are unbounded; only success or a non-throttle error terminates
//!   the loop.
//! - A zero-length backoff still yields to the scheduler once before the
//!   next attempt, so the loop can never spin without suspension.

use crate::store::{StoreError, StoreResult};
use log::debug;
use std::future::Future;

/// Runs `operation` until it succeeds or fails with a non-throttle error.
///
/// The operation is a zero-argument async closure; each attempt gets a fresh
/// future. On `StoreError::Throttled { retry_after }` the executor suspends
/// for exactly `retry_after`, then retries.
pub async fn execute_with_retries<T, F, Fut>(mut operation: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut attempt: u64 = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(StoreError::Throttled { retry_after }) => {
                debug!(
                    "event=retry_backoff module=retry status=start attempt={attempt} wait_ms={}",
                    retry_after.as_millis()
                );
                if retry_after.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(retry_after).await;
                }
                attempt += 1;
            }
            Err(other) => return Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::execute_with_retries;
    use crate::store::{StoreError, StoreResult};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    async fn throttle_then_succeed(
        calls: &AtomicU32,
        throttles: u32,
        retry_after: Duration,
    ) -> StoreResult<u32> {
        let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= throttles {
            Err(StoreError::Throttled { retry_after })
        } else {
            Ok(call)
        }
    }

    #[tokio::test]
    async fn returns_success_immediately_without_retry() {
        let calls = AtomicU32::new(0);
        let result = execute_with_retries(|| throttle_then_succeed(&calls, 0, Duration::ZERO))
            .await
            .expect("operation should succeed");
        assert_eq!(result, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_exactly_once_per_throttle() {
        let calls = AtomicU32::new(0);
        let result =
            execute_with_retries(|| throttle_then_succeed(&calls, 3, Duration::from_millis(20)))
                .await
                .expect("operation should succeed after throttles");
        assert_eq!(result, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_the_server_supplied_backoff() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();
        execute_with_retries(|| throttle_then_succeed(&calls, 2, Duration::from_secs(1)))
            .await
            .expect("operation should succeed after throttles");
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn zero_length_backoff_still_retries() {
        let calls = AtomicU32::new(0);
        let result = execute_with_retries(|| throttle_then_succeed(&calls, 2, Duration::ZERO))
            .await
            .expect("operation should succeed after zero-wait throttles");
        assert_eq!(result, 3);
    }

    #[tokio::test]
    async fn non_throttle_error_propagates_with_zero_retries() {
        let calls = AtomicU32::new(0);
        let err = execute_with_retries(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(StoreError::Backend("boom".to_string()))
        })
        .await
        .expect_err("backend error should propagate");
        assert!(matches!(err, StoreError::Backend(message) if message == "boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
