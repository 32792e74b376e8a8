//! Retry policy engine.
//!
//! A failed invocation walks `Pending -> Scheduled -> Executing ->
//! {Succeeded, Exhausted}`. The engine only computes delays and the
//! retry/exhaust decision; the host's timer owns the actual waiting, and an
//! abandoned session simply never resumes. Retries replay the same decoded
//! input the first attempt saw.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Serialize durations as integer milliseconds, the unit used in
/// declarative retry metadata.
mod duration_ms {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        duration: &Duration,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Duration, D::Error> {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

/// Retry policy attached to a trigger function. At most one per function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy")]
pub enum RetryPolicy {
    /// A constant delay between attempts.
    #[serde(rename = "fixedDelay", rename_all = "camelCase")]
    FixedDelay {
        max_retry_count: u32,
        #[serde(with = "duration_ms")]
        delay_interval: Duration,
    },
    /// Delay doubles per attempt, capped at `maximum_interval`.
    /// `max_retry_count` of -1 retries without bound.
    #[serde(rename = "exponentialBackoff", rename_all = "camelCase")]
    ExponentialBackoff {
        max_retry_count: i32,
        #[serde(with = "duration_ms")]
        minimum_interval: Duration,
        #[serde(with = "duration_ms")]
        maximum_interval: Duration,
    },
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<()> {
        match self {
            RetryPolicy::FixedDelay { .. } => Ok(()),
            RetryPolicy::ExponentialBackoff {
                max_retry_count,
                minimum_interval,
                maximum_interval,
            } => {
                if *max_retry_count < -1 {
                    return Err(Error::Configuration(
                        "maxRetryCount must be -1 (unlimited) or non-negative".to_string(),
                    ));
                }
                if minimum_interval > maximum_interval {
                    return Err(Error::Configuration(
                        "minimumInterval must not exceed maximumInterval".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Maximum number of retries, or `None` for unlimited.
    pub fn max_retry_count(&self) -> Option<u32> {
        match self {
            RetryPolicy::FixedDelay {
                max_retry_count, ..
            } => Some(*max_retry_count),
            RetryPolicy::ExponentialBackoff {
                max_retry_count, ..
            } => {
                if *max_retry_count < 0 {
                    None
                } else {
                    Some(*max_retry_count as u32)
                }
            }
        }
    }

    /// Delay before retry `attempt` (1-based).
    ///
    /// Exponential backoff doubles from the minimum: attempt n waits
    /// `min(maximum, minimum * 2^(n-1))`. Deterministic; no jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            RetryPolicy::FixedDelay { delay_interval, .. } => *delay_interval,
            RetryPolicy::ExponentialBackoff {
                minimum_interval,
                maximum_interval,
                ..
            } => {
                let exponent = attempt.saturating_sub(1).min(63) as i32;
                let ms = (minimum_interval.as_millis() as f64 * 2.0f64.powi(exponent)) as u64;
                Duration::from_millis(ms).min(*maximum_interval)
            }
        }
    }
}

/// Where a retry session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// No attempt has run yet.
    Pending,
    /// Waiting out the delay before the next attempt.
    Scheduled(Duration),
    /// An attempt is in flight.
    Executing,
    Succeeded,
    Exhausted,
}

/// Outcome of recording a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-attempt after the given delay.
    Retry(Duration),
    /// No attempts left; the failure is permanent.
    Exhausted,
}

/// Tracks one record/batch through its retry lifecycle.
///
/// The session never sleeps; callers schedule the returned delay and call
/// [`RetrySession::begin_attempt`] when the re-attempt actually starts.
#[derive(Debug, Clone)]
pub struct RetrySession {
    policy: RetryPolicy,
    retries: u32,
    state: RetryState,
}

impl RetrySession {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            retries: 0,
            state: RetryState::Pending,
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Retries scheduled so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Total attempts made, counting the initial one.
    pub fn attempts(&self) -> u32 {
        self.retries + 1
    }

    pub fn begin_attempt(&mut self) {
        self.state = RetryState::Executing;
    }

    pub fn record_success(&mut self) {
        self.state = RetryState::Succeeded;
    }

    /// Record a failed attempt and decide what happens next.
    pub fn record_failure(&mut self) -> RetryDecision {
        if matches!(self.state, RetryState::Exhausted) {
            return RetryDecision::Exhausted;
        }
        let allowed = self.policy.max_retry_count();
        if allowed.is_some_and(|max| self.retries >= max) {
            self.state = RetryState::Exhausted;
            return RetryDecision::Exhausted;
        }
        self.retries += 1;
        let delay = self.policy.delay_for_attempt(self.retries);
        self.state = RetryState::Scheduled(delay);
        RetryDecision::Retry(delay)
    }
}
