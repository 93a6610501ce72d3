//! Retry loop for GitHub statistics requests.
//!
//! Statistics endpoints answer 202 until their data has been computed, and
//! any endpoint may answer 429. Both are retried after a fixed delay; every
//! other failure ends the loop immediately.

use crate::github::{Attempt, ClientError};
use backon::{ConstantBuilder, Retryable};
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Attempts made before giving up on a request.
pub const MAX_ATTEMPTS: u32 = 60;

/// Delay after an "accepted, not ready" answer.
pub const NOT_READY_DELAY: Duration = Duration::from_secs(2);

/// Delay after a rate-limited answer.
pub const THROTTLED_DELAY: Duration = Duration::from_secs(5);

/// Attempt budget and delays for [`with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub not_ready_delay: Duration,
    pub throttled_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            not_ready_delay: NOT_READY_DELAY,
            throttled_delay: THROTTLED_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Constant backoff allowing `max_attempts` calls in total.
    ///
    /// The delay is replaced per answer kind before each sleep.
    #[must_use]
    pub fn into_backoff(self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.not_ready_delay)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }
}

/// Terminal outcome of a retried request.
#[derive(Debug, Error)]
pub enum RetryError {
    #[error(transparent)]
    Failed(#[from] ClientError),

    #[error("max tries exceeded after {attempts} attempts")]
    MaxTriesExceeded { attempts: u32 },

    #[error("request cancelled")]
    Cancelled,
}

/// A non-ready answer, as seen by the backoff loop.
#[derive(Debug, Error)]
enum Pending {
    #[error("accepted but not ready")]
    NotReady,

    #[error("rate limited")]
    Throttled,

    #[error(transparent)]
    Failed(ClientError),
}

impl Pending {
    fn is_transient(&self) -> bool {
        matches!(self, Pending::NotReady | Pending::Throttled)
    }

    fn delay(&self, policy: &RetryPolicy) -> Duration {
        match self {
            Pending::Throttled => policy.throttled_delay,
            _ => policy.not_ready_delay,
        }
    }
}

fn into_result<T>(attempt: Attempt<T>) -> Result<T, Pending> {
    match attempt {
        Attempt::Ready(value) => Ok(value),
        Attempt::NotReady => Err(Pending::NotReady),
        Attempt::Throttled => Err(Pending::Throttled),
        Attempt::Failed(err) => Err(Pending::Failed(err)),
    }
}

/// Run `operation` until it yields a value, fails, or the budget runs out.
///
/// The whole loop, requests and delays alike, races `cancel`.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    target: &str,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let attempt = AtomicU32::new(0);

    let request = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        let pending = operation();
        async move { into_result(pending.await) }
    };

    let retrying = request
        .retry(policy.into_backoff())
        .when(Pending::is_transient)
        .adjust(|pending, next| next.map(|_| pending.delay(policy)))
        .notify(|pending, delay| {
            debug!(
                "{}: {}, retrying in {:?} (attempt {})",
                target,
                pending,
                delay,
                attempt.load(Ordering::SeqCst)
            );
        });

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(RetryError::Cancelled),
        outcome = retrying => outcome,
    };

    outcome.map_err(|pending| match pending {
        Pending::Failed(err) => RetryError::Failed(err),
        Pending::NotReady | Pending::Throttled => RetryError::MaxTriesExceeded {
            attempts: policy.max_attempts,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 60);
        assert_eq!(policy.not_ready_delay, Duration::from_secs(2));
        assert_eq!(policy.throttled_delay, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_three_times_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);
        let start = Instant::now();

        let result = with_retry(
            &RetryPolicy::default(),
            &CancellationToken::new(),
            "me/repo",
            move || {
                let n = calls_capture.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 3 {
                        Attempt::Throttled
                    } else {
                        Attempt::Ready(42u64)
                    }
                }
            },
        )
        .await;

        assert_eq!(assert_ok!(result), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(start.elapsed() >= THROTTLED_DELAY * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn not_ready_uses_shorter_delay() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);
        let start = Instant::now();

        let result = with_retry(
            &RetryPolicy::default(),
            &CancellationToken::new(),
            "me/repo",
            move || {
                let n = calls_capture.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Attempt::NotReady
                    } else {
                        Attempt::Ready("done")
                    }
                }
            },
        )
        .await;

        assert_eq!(assert_ok!(result), "done");
        let elapsed = start.elapsed();
        assert!(elapsed >= NOT_READY_DELAY);
        assert!(elapsed < THROTTLED_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_follows_each_answer_kind() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);
        let start = Instant::now();

        let result = with_retry(
            &RetryPolicy::default(),
            &CancellationToken::new(),
            "me/repo",
            move || {
                let n = calls_capture.fetch_add(1, Ordering::SeqCst);
                async move {
                    match n {
                        0 => Attempt::Throttled,
                        1 => Attempt::NotReady,
                        _ => Attempt::Ready(7u64),
                    }
                }
            },
        )
        .await;

        assert_eq!(assert_ok!(result), 7);
        let elapsed = start.elapsed();
        assert!(elapsed >= THROTTLED_DELAY + NOT_READY_DELAY);
        assert!(elapsed < THROTTLED_DELAY + NOT_READY_DELAY + Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_allows_budget_minus_one_retries() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };
        let delays: Vec<_> = backon::BackoffBuilder::build(policy.into_backoff()).collect();
        assert_eq!(delays, vec![NOT_READY_DELAY; 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_budget_is_max_tries_exceeded() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let result = with_retry(
            &RetryPolicy::default(),
            &CancellationToken::new(),
            "me/repo",
            move || {
                calls_capture.fetch_add(1, Ordering::SeqCst);
                async { Attempt::<u64>::NotReady }
            },
        )
        .await;

        let err = assert_err!(result);
        assert!(matches!(err, RetryError::MaxTriesExceeded { attempts: 60 }));
        assert_eq!(calls.load(Ordering::SeqCst), 60);
    }

    #[tokio::test]
    async fn other_failures_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let result = with_retry(
            &RetryPolicy::default(),
            &CancellationToken::new(),
            "me/repo",
            move || {
                calls_capture.fetch_add(1, Ordering::SeqCst);
                async { Attempt::<u64>::Failed(ClientError::status(404, "Not Found")) }
            },
        )
        .await;

        let err = assert_err!(result);
        assert_eq!(err.to_string(), "GitHub API error 404: Not Found");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_sleep() {
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        let result = with_retry(&RetryPolicy::default(), &cancel, "me/repo", || async {
            Attempt::<u64>::Throttled
        })
        .await;

        assert!(matches!(assert_err!(result), RetryError::Cancelled));
        assert!(start.elapsed() < THROTTLED_DELAY);
    }

    #[tokio::test]
    async fn cancelled_token_skips_the_request() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let result = with_retry(&RetryPolicy::default(), &cancel, "me/repo", move || {
            calls_capture.fetch_add(1, Ordering::SeqCst);
            async { Attempt::Ready(1u64) }
        })
        .await;

        assert!(matches!(assert_err!(result), RetryError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
