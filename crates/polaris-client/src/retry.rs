//! Bounded retry with exponential backoff.
//!
//! Wraps one async operation and re-executes it on failure until the
//! attempt budget runs out. Rate-limit failures follow the same backoff
//! as any other failure; the distinction is logged but not acted on.
//! Nothing is cached between attempts -- every retry re-sends the full
//! request, which is acceptable because the wrapped operations are
//! idempotent from the caller's perspective (regenerating a completion,
//! not mutating a ledger).

use std::time::Duration;

use tracing::warn;

use crate::error::ClientError;

/// Retry budget and backoff schedule.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Delay before the first retry; doubles after each failure.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A policy with the given attempt count and backoff start.
    pub const fn new(attempts: u32, initial_delay: Duration) -> Self {
        Self {
            attempts,
            initial_delay,
        }
    }
}

/// Execute `op`, retrying on failure up to the policy's budget.
///
/// The last error propagates unchanged once the budget is exhausted.
///
/// # Errors
///
/// Whatever error the final attempt produced.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let attempts = policy.attempts.max(1);
    let mut delay = policy.initial_delay;
    let mut last_error = ClientError::Config(String::from("retry budget exhausted"));

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt < attempts {
                    warn!(
                        attempt = attempt,
                        of = attempts,
                        delay_ms = delay.as_millis(),
                        rate_limited = error.is_rate_limited(),
                        error = %error,
                        "model call failed, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                last_error = error;
            }
        }
    }

    Err(last_error)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn flaky_error() -> ClientError {
        ClientError::Vendor {
            code: String::from("500"),
            message: String::from("the AI service failed while processing the request"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_skips_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = with_retry(RetryPolicy::default(), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ClientError>(42)
            }
        })
        .await;

        assert_eq!(result.ok(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let result = with_retry(policy, move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(flaky_error())
                } else {
                    Ok(String::from("recovered"))
                }
            }
        })
        .await;

        assert_eq!(result.ok().as_deref(), Some("recovered"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_budget_and_keeps_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let policy = RetryPolicy::new(3, Duration::from_millis(50));
        let result: Result<u32, _> = with_retry(policy, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(flaky_error())
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(ClientError::Vendor { code, .. }) if code == "500"));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_errors_use_same_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        let result: Result<u32, _> = with_retry(policy, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ClientError::Vendor {
                    code: String::from("429"),
                    message: String::from("concurrency quota exceeded"),
                })
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempt_budget_still_runs_once() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        let result = with_retry(policy, || async { Ok::<_, ClientError>(7) }).await;
        assert_eq!(result.ok(), Some(7));
    }
}
