//! Bounded exponential backoff around a single GitHub request.
//!
//! - Default: 4 attempts in total, with 1s, 2s, 4s delays between them
//!   (30s cap, multiplier 2.0)
//!
//! Only transient errors are retried. Permanent errors are returned after a
//! single attempt. The backoff sleep observes a [`CancellationToken`] and
//! aborts the loop as soon as it fires.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::{GitHubApiError, GitHubErrorKind};

/// How many times to try a request and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Cap for exponential growth.
    pub max_delay: Duration,

    /// Values below 1.0 are treated as 1.0.
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Default retry configuration for GitHub API operations.
    ///
    /// - 3 retries with 1s, 2s, 4s delays
    /// - Total max wait: 7 seconds
    pub const DEFAULT: Self = Self {
        max_attempts: 4,
        initial_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(30),
        backoff_multiplier: 2.0,
    };

    /// A single attempt with no retries.
    pub const NO_RETRY: Self = Self {
        max_attempts: 1,
        initial_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
        backoff_multiplier: 1.0,
    };

    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Computes the delay before the given retry (0-indexed).
    ///
    /// `min(initial_delay * backoff_multiplier^retry, max_delay)`.
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let multiplier = self.backoff_multiplier.max(1.0).powi(retry as i32);
        let delay_nanos = self.initial_delay.as_nanos() as f64 * multiplier;
        let max_nanos = self.max_delay.as_nanos() as f64;
        if delay_nanos >= max_nanos {
            self.max_delay
        } else {
            Duration::from_nanos(delay_nanos.round() as u64)
        }
    }

    /// The sleep before each retry, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts.saturating_sub(1)).map(|retry| self.delay_for_attempt(retry))
    }

    /// Upper bound on time spent sleeping across one retry loop.
    pub fn total_max_wait(&self) -> Duration {
        self.delays().sum()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Result of a retry loop.
#[derive(Debug)]
pub enum RetryResult<T> {
    Success(T),

    /// A transient error occurred on every attempt.
    ExhaustedRetries {
        /// The error from the final attempt, unchanged.
        last_error: GitHubApiError,
        attempts: u32,
    },

    /// A non-retriable error occurred.
    PermanentError(GitHubApiError),

    /// The cancellation token fired before the loop finished.
    Cancelled { attempts: u32 },
}

impl<T> RetryResult<T> {
    /// Converts to a Result. Cancellation becomes a `Cancelled` error naming
    /// `operation`.
    pub fn into_result(self, operation: &'static str) -> Result<T, GitHubApiError> {
        match self {
            RetryResult::Success(v) => Ok(v),
            RetryResult::ExhaustedRetries { last_error, .. } => Err(last_error),
            RetryResult::PermanentError(e) => Err(e),
            RetryResult::Cancelled { .. } => Err(GitHubApiError::cancelled(operation)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success(_))
    }
}

/// Runs `operation` until it succeeds, fails permanently, or runs out of
/// attempts.
///
/// It is invoked at most `config.max_attempts` times. Between
/// attempts the loop sleeps for the configured backoff unless `cancel` fires,
/// in which case it returns [`RetryResult::Cancelled`] immediately. The token
/// is also checked before every attempt.
pub async fn retry_with_backoff<T, F, Fut>(
    config: RetryConfig,
    operation_name: &'static str,
    cancel: &CancellationToken,
    mut operation: F,
) -> RetryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GitHubApiError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return RetryResult::Cancelled { attempts: attempt };
        }

        match operation().await {
            Ok(value) => {
                if attempt != 0 {
                    debug!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        "succeeded after retry"
                    );
                }
                return RetryResult::Success(value);
            }
            Err(e) => {
                attempt += 1;

                match e.kind {
                    GitHubErrorKind::Permanent | GitHubErrorKind::Cancelled => {
                        return RetryResult::PermanentError(e);
                    }
                    GitHubErrorKind::Transient => {
                        if attempt >= max_attempts {
                            warn!(
                                operation = operation_name,
                                attempts = attempt,
                                error = %e,
                                "giving up after exhausting retries"
                            );
                            return RetryResult::ExhaustedRetries {
                                last_error: e,
                                attempts: attempt,
                            };
                        }

                        let delay = config.delay_for_attempt(attempt - 1);
                        debug!(
                            operation = operation_name,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "transient error, backing off"
                        );

                        tokio::select! {
                            _ = cancel.cancelled() => {
                                return RetryResult::Cancelled { attempts: attempt };
                            }
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Shared call counter handed into the retried closure.
    #[derive(Clone, Default)]
    struct Attempts(Arc<AtomicU32>);

    impl Attempts {
        fn bump(&self) -> u32 {
            self.0.fetch_add(1, Ordering::SeqCst)
        }

        fn count(&self) -> u32 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn quick(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            backoff_multiplier: 2.0,
        }
    }

    fn status_error(status: u16) -> GitHubApiError {
        GitHubApiError::from_response(status, r#"{"message": "boom"}"#)
    }

    // ─── Schedule ─────────────────────────────────────────────────────────────

    #[test]
    fn default_schedule_is_one_two_four_seconds() {
        let schedule: Vec<u64> = RetryConfig::default()
            .delays()
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(schedule, [1, 2, 4]);
        assert_eq!(RetryConfig::DEFAULT.max_attempts, 4);
        assert_eq!(RetryConfig::DEFAULT.total_max_wait(), Duration::from_secs(7));
    }

    #[test]
    fn long_schedules_flatten_at_the_cap() {
        let config = RetryConfig {
            max_attempts: 10,
            ..RetryConfig::DEFAULT
        };
        let schedule: Vec<u64> = config.delays().map(|d| d.as_secs()).collect();
        assert_eq!(schedule, [1, 2, 4, 8, 16, 30, 30, 30, 30]);
    }

    #[test]
    fn multiplier_below_one_does_not_shrink() {
        let config = RetryConfig::new(4, Duration::from_secs(2), Duration::from_secs(30), 0.5);
        assert!(config.delays().all(|d| d == Duration::from_secs(2)));
    }

    #[test]
    fn no_retry_has_no_delays() {
        assert_eq!(RetryConfig::NO_RETRY.delays().count(), 0);
    }

    // ─── Loop ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn first_success_makes_one_call() {
        let attempts = Attempts::default();
        let tracker = attempts.clone();

        let result = retry_with_backoff(
            quick(4),
            "get_repository",
            &CancellationToken::new(),
            move || {
                tracker.bump();
                async { Ok::<_, GitHubApiError>("octo/app") }
            },
        )
        .await;

        assert_eq!(result.into_result("get_repository").unwrap(), "octo/app");
        assert_eq!(attempts.count(), 1);
    }

    #[tokio::test]
    async fn not_found_is_returned_without_retrying() {
        let attempts = Attempts::default();
        let tracker = attempts.clone();

        let result = retry_with_backoff(
            quick(4),
            "get_pull_request",
            &CancellationToken::new(),
            move || {
                tracker.bump();
                async { Err::<(), _>(status_error(404)) }
            },
        )
        .await;

        let RetryResult::PermanentError(err) = result else {
            panic!("404 should be permanent");
        };
        assert_eq!(err.status_code, Some(404));
        assert_eq!(attempts.count(), 1);
    }

    #[tokio::test]
    async fn bad_gateway_twice_then_success() {
        let attempts = Attempts::default();
        let tracker = attempts.clone();

        let result = retry_with_backoff(
            quick(4),
            "list_commits",
            &CancellationToken::new(),
            move || {
                let n = tracker.bump();
                async move { if n < 2 { Err(status_error(502)) } else { Ok(n) } }
            },
        )
        .await;

        assert!(matches!(result, RetryResult::Success(2)));
        assert_eq!(attempts.count(), 3);
    }

    #[tokio::test]
    async fn exhaustion_reports_the_last_error_unchanged() {
        let attempts = Attempts::default();
        let tracker = attempts.clone();

        let result = retry_with_backoff(
            quick(3),
            "compare_refs",
            &CancellationToken::new(),
            move || {
                let n = tracker.bump();
                async move {
                    Err::<(), _>(GitHubApiError::transient_without_source(format!("failure {n}")))
                }
            },
        )
        .await;

        let RetryResult::ExhaustedRetries { last_error, attempts: made } = result else {
            panic!("transient failures should exhaust the budget");
        };
        assert_eq!(made, 3);
        assert_eq!(last_error.message, "failure 2");
        assert!(last_error.is_retriable());
        assert_eq!(attempts.count(), 3);
    }

    #[tokio::test]
    async fn single_attempt_config_never_sleeps() {
        let attempts = Attempts::default();
        let tracker = attempts.clone();

        let result = retry_with_backoff(
            RetryConfig::NO_RETRY,
            "rerun_workflow",
            &CancellationToken::new(),
            move || {
                tracker.bump();
                async { Err::<(), _>(status_error(500)) }
            },
        )
        .await;

        assert!(matches!(result, RetryResult::ExhaustedRetries { attempts: 1, .. }));
        assert_eq!(attempts.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_between_attempts_follow_the_schedule() {
        let start = tokio::time::Instant::now();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let log = seen.clone();

        let _ = retry_with_backoff(
            RetryConfig::DEFAULT,
            "list_workflow_runs",
            &CancellationToken::new(),
            move || {
                log.lock().push(start.elapsed());
                async { Err::<(), _>(status_error(503)) }
            },
        )
        .await;

        let seen = seen.lock();
        assert_eq!(seen.len(), 4);
        for (pair, secs) in seen.windows(2).zip([1u64, 2, 4]) {
            let gap = pair[1] - pair[0];
            let expected = Duration::from_secs(secs);
            assert!(
                gap >= expected && gap < expected + Duration::from_millis(50),
                "gap {:?}, expected {:?}",
                gap,
                expected
            );
        }
    }

    // ─── Cancellation ─────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn cancelling_mid_backoff_ends_the_loop() {
        let attempts = Attempts::default();
        let tracker = attempts.clone();
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            canceller.cancel();
        });

        let result = retry_with_backoff(RetryConfig::DEFAULT, "list_commits", &cancel, move || {
            tracker.bump();
            async { Err::<(), _>(status_error(429)) }
        })
        .await;

        assert!(matches!(result, RetryResult::Cancelled { attempts: 1 }));
        assert_eq!(attempts.count(), 1);
        assert!(result.into_result("list_commits").unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_token_prevents_the_first_call() {
        let attempts = Attempts::default();
        let tracker = attempts.clone();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = retry_with_backoff(RetryConfig::DEFAULT, "delete_branch", &cancel, move || {
            tracker.bump();
            async { Ok::<_, GitHubApiError>(()) }
        })
        .await;

        assert!(matches!(result, RetryResult::Cancelled { attempts: 0 }));
        assert_eq!(attempts.count(), 0);
    }

    proptest! {
        #[test]
        fn nth_delay_is_capped_power(
            initial_ms in 1u64..1000,
            max_ms in 1000u64..60000,
            multiplier in 1.0f64..3.0,
            retry in 0u32..12,
        ) {
            let config = RetryConfig::new(
                20,
                Duration::from_millis(initial_ms),
                Duration::from_millis(max_ms),
                multiplier,
            );

            let expected_ms = (initial_ms as f64 * multiplier.powi(retry as i32)).min(max_ms as f64);
            let actual_ms = config.delay_for_attempt(retry).as_secs_f64() * 1000.0;
            prop_assert!((actual_ms - expected_ms).abs() < 0.001);
            prop_assert!(config.delay_for_attempt(retry) <= Duration::from_millis(max_ms));
        }

        #[test]
        fn schedule_never_shrinks(
            initial_ms in 1u64..1000,
            max_ms in 1000u64..60000,
            multiplier in 1.0f64..3.0,
            max_attempts in 1u32..15,
        ) {
            let config = RetryConfig::new(
                max_attempts,
                Duration::from_millis(initial_ms),
                Duration::from_millis(max_ms),
                multiplier,
            );

            let schedule: Vec<_> = config.delays().collect();
            prop_assert_eq!(schedule.len() as u32, max_attempts - 1);
            prop_assert!(schedule.windows(2).all(|w| w[0] <= w[1]));
            prop_assert!(config.total_max_wait() <= Duration::from_millis(max_ms) * (max_attempts - 1));
        }
    }
}
