// Bounded retry around a single logical fetch
use crate::application::poller::Generation;
use crate::error::SyncError;
use std::future::Future;
use std::time::Duration;

/// Fixed-delay retry, matching the backend dashboard's behavior: 4 total
/// attempts with 2 seconds between them, not exponential.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub attempts: u32,
    pub result: Result<T, SyncError>,
}

/// Run `op` up to `policy.max_attempts` times, stopping early on the first
/// success. On exhaustion the last observed error is returned, tagged with
/// the attempt count. The generation is checked before every attempt: once
/// the owning poller has moved on, no further attempts execute and the
/// outcome comes back as `Cancelled`.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    generation: &Generation,
    op: F,
) -> RetryOutcome<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    let mut attempts = 0;
    let mut last_error = SyncError::Cancelled;

    while attempts < policy.max_attempts {
        if !generation.is_current() {
            return RetryOutcome {
                attempts,
                result: Err(SyncError::Cancelled),
            };
        }
        attempts += 1;

        match op().await {
            Ok(value) => {
                return RetryOutcome {
                    attempts,
                    result: Ok(value),
                };
            }
            Err(err) => {
                tracing::warn!(
                    attempt = attempts,
                    max_attempts = policy.max_attempts,
                    error = %err,
                    "fetch attempt failed"
                );
                last_error = err;
            }
        }

        if attempts < policy.max_attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }

    tracing::error!(attempts, error = %last_error, "retries exhausted");
    RetryOutcome {
        attempts,
        result: Err(last_error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn flaky_op(
        calls: Arc<AtomicU32>,
        failures_before_success: u32,
    ) -> impl Fn() -> std::pin::Pin<Box<dyn Future<Output = Result<u32, SyncError>> + Send>> {
        move || {
            let calls = calls.clone();
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n > failures_before_success {
                    Ok(n)
                } else {
                    Err(SyncError::Http { status: 503 })
                }
            })
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_succeeds_on_fourth_attempt_within_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let outcome = with_retry(
            fast_policy(4),
            &Generation::detached(),
            flaky_op(calls.clone(), 3),
        )
        .await;

        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.result.unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error_with_attempt_count() {
        let calls = Arc::new(AtomicU32::new(0));
        let outcome = with_retry(
            fast_policy(3),
            &Generation::detached(),
            flaky_op(calls.clone(), 3),
        )
        .await;

        assert_eq!(outcome.attempts, 3);
        match outcome.result {
            Err(SyncError::Http { status }) => assert_eq!(status, 503),
            other => panic!("expected http error, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_first_success_stops_retrying() {
        let calls = Arc::new(AtomicU32::new(0));
        let outcome = with_retry(
            fast_policy(4),
            &Generation::detached(),
            flaky_op(calls.clone(), 0),
        )
        .await;

        assert_eq!(outcome.attempts, 1);
        assert!(outcome.result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_mid_retry_stops_further_attempts() {
        use crate::application::poller::Poller;

        let mut poller = Poller::new();
        let generation = poller.generation();

        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            max_attempts: 10,
            delay: Duration::from_millis(50),
        };

        let retry = tokio::spawn({
            let calls = calls.clone();
            async move { with_retry(policy, &generation, flaky_op(calls, u32::MAX)).await }
        });

        // Let the first attempt fail, then invalidate the generation while
        // the retry loop is sleeping.
        tokio::time::sleep(Duration::from_millis(10)).await;
        poller.stop();

        let outcome = retry.await.unwrap();
        assert!(matches!(outcome.result, Err(SyncError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
