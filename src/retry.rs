//! Retry/backoff policy and consecutive-failure bookkeeping.
//!
//! The policy itself is a pure function from the consecutive-failure count to
//! a delay and an availability verdict. All mutable state lives in
//! [`RetryState`], owned exclusively by the coordinator.

use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// Backoff schedule in minutes; the last entry holds for further failures.
const RETRY_BACKOFF_MINUTES: [u64; 3] = [15, 30, 60];

/// Consecutive failures after which consumers should treat data as
/// unavailable.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Verdict of the backoff policy for a given failure count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    /// How long to wait before the next fetch attempt.
    pub delay: Duration,
    /// Whether the data should still be considered available.
    pub available: bool,
}

/// Pure, stateless backoff policy.
///
/// | failures | delay | available |
/// |----------|-------|-----------|
/// | 0        | 15min | yes       |
/// | 1        | 30min | yes       |
/// | 2        | 60min | yes       |
/// | 3        | 60min | no        |
/// | 10       | 60min | no        |
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy;

impl RetryPolicy {
    /// The delay and availability verdict for `consecutive_failures`.
    pub fn next(consecutive_failures: u32) -> RetryDecision {
        let index = (consecutive_failures as usize).min(RETRY_BACKOFF_MINUTES.len() - 1);
        RetryDecision {
            delay: Duration::from_secs(RETRY_BACKOFF_MINUTES[index] * 60),
            available: consecutive_failures < MAX_CONSECUTIVE_FAILURES,
        }
    }
}

/// Coordinator-internal failure bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    /// Fetch attempts that failed since the last success.
    pub consecutive_failures: u32,
    /// Earliest time a non-forced refresh should fetch again.
    pub next_retry_at: Option<DateTime<Utc>>,
    /// Availability verdict as of the last recorded outcome.
    pub available: bool,
}

impl Default for RetryState {
    fn default() -> Self {
        Self {
            consecutive_failures: 0,
            next_retry_at: None,
            available: true,
        }
    }
}

impl RetryState {
    /// Record a failed fetch at `now`; returns the policy verdict for the
    /// updated count.
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> RetryDecision {
        self.consecutive_failures += 1;
        let decision = RetryPolicy::next(self.consecutive_failures);
        self.available = decision.available;
        self.next_retry_at = Some(now + TimeDelta::seconds(decision.delay.as_secs() as i64));
        decision
    }

    /// Record a successful fetch: full reset.
    pub fn record_success(&mut self) {
        *self = Self::default();
    }

    /// Whether `now` is still inside the backoff window.
    pub fn in_backoff(&self, now: DateTime<Utc>) -> bool {
        self.next_retry_at.is_some_and(|at| now < at)
    }
}
