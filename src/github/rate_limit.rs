//! Client-side view of the GitHub REST rate limit.
//!
//! GitHub reports the remaining quota and its reset time on every response
//! (`x-ratelimit-remaining`, `x-ratelimit-reset`). [`RateBudget`] keeps the
//! latest values and holds callers back once the quota drops to the
//! configured threshold, until the window resets or 60 seconds pass,
//! whichever comes first.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::error::GitHubApiError;

/// GitHub's documented hourly quota for authenticated REST calls.
pub const DEFAULT_REMAINING: u32 = 5000;

/// Default low-water mark below which calls are held back.
pub const DEFAULT_THRESHOLD: u32 = 10;

/// Longest a single wait may block, regardless of the reset time.
pub const MAX_WAIT: Duration = Duration::from_secs(60);

/// Rate-limit values read off one response. Either may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub remaining: Option<u32>,
    /// UNIX epoch seconds at which the quota resets.
    pub reset_epoch: Option<i64>,
}

impl RateLimitHeaders {
    /// Parses raw header values. Unparsable values are dropped.
    pub fn from_header_values(remaining: Option<&str>, reset: Option<&str>) -> Self {
        Self {
            remaining: remaining.and_then(|v| v.trim().parse().ok()),
            reset_epoch: reset.and_then(|v| v.trim().parse().ok()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_none() && self.reset_epoch.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
struct RateState {
    remaining: u32,
    reset_at: Option<DateTime<Utc>>,
}

/// Shared rate-limit state for every call made through one client.
///
/// The lock is held only while reading or writing the two fields; waiting
/// happens outside it.
#[derive(Debug)]
pub struct RateBudget {
    state: Mutex<RateState>,
    threshold: u32,
}

impl RateBudget {
    pub fn new(threshold: u32) -> Self {
        Self {
            state: Mutex::new(RateState {
                remaining: DEFAULT_REMAINING,
                reset_at: None,
            }),
            threshold,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn remaining(&self) -> u32 {
        self.state.lock().remaining
    }

    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().reset_at
    }

    /// Records the rate-limit values from a response.
    ///
    /// Each field is overwritten only when the response carried it.
    pub fn update(&self, headers: RateLimitHeaders) {
        if headers.is_empty() {
            return;
        }

        let reset_at = headers
            .reset_epoch
            .and_then(|epoch| Utc.timestamp_opt(epoch, 0).single());

        let remaining = {
            let mut state = self.state.lock();
            if let Some(remaining) = headers.remaining {
                state.remaining = remaining;
            }
            if reset_at.is_some() {
                state.reset_at = reset_at;
            }
            state.remaining
        };

        if headers.remaining.is_some() && remaining <= self.threshold {
            warn!(
                remaining,
                threshold = self.threshold,
                reset_at = ?reset_at,
                "GitHub rate limit is low"
            );
        }
    }

    /// How long a call made at `now` would have to wait, if at all.
    ///
    /// `None` when `remaining` is above the threshold, when no reset time is
    /// known, or when the reset time has already passed.
    pub fn pending_wait(&self, now: DateTime<Utc>) -> Option<Duration> {
        let state = *self.state.lock();
        if state.remaining > self.threshold {
            return None;
        }

        let until_reset = state.reset_at?.signed_duration_since(now).to_std().ok()?;
        if until_reset.is_zero() {
            return None;
        }
        Some(until_reset.min(MAX_WAIT))
    }

    /// Blocks until the budget allows another call.
    ///
    /// Returns the time spent waiting, or a `Cancelled` error if `cancel`
    /// fires first.
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<Option<Duration>, GitHubApiError> {
        let Some(delay) = self.pending_wait(Utc::now()) else {
            return Ok(None);
        };

        info!(
            wait_ms = delay.as_millis() as u64,
            remaining = self.remaining(),
            "rate limit nearly exhausted, waiting"
        );

        tokio::select! {
            _ = cancel.cancelled() => Err(GitHubApiError::cancelled("rate_limit_wait")),
            _ = tokio::time::sleep(delay) => Ok(Some(delay)),
        }
    }
}

impl Default for RateBudget {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}
