//! Retry policy for catalog requests.
//!
//! Implements jittered exponential backoff with configurable parameters.

use crate::config::RetrySettings;
use rand::Rng;
use std::time::Duration;

/// Why an attempt is being retried; selects the base delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Overload, rate limit, queued (202), connection or timeout errors.
    Transient,
    /// 401/403: the service throttles this way, so back off harder.
    Throttled,
    /// 2xx with a body that could not be parsed.
    Unparsable,
}

/// Retry policy implementing jittered exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per logical request, including the first one.
    pub max_attempts: u32,
    /// Base delay for [`Backoff::Transient`].
    pub base_delay: Duration,
    /// Base delay for [`Backoff::Throttled`].
    pub slow_base_delay: Duration,
    /// Base delay for [`Backoff::Unparsable`].
    pub parse_base_delay: Duration,
    /// Multiplier applied to the delay after each attempt.
    pub growth: f64,
    /// Lower bound (inclusive) of the jitter factor.
    pub jitter_low: f64,
    /// Upper bound (exclusive) of the jitter factor.
    pub jitter_high: f64,
    /// Cap applied after jitter.
    pub max_delay: Option<Duration>,
}

impl RetryPolicy {
    /// Create a new RetryPolicy from configuration settings.
    pub fn new(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            slow_base_delay: Duration::from_millis(settings.slow_base_delay_ms),
            parse_base_delay: Duration::from_millis(settings.parse_base_delay_ms),
            growth: settings.growth,
            jitter_low: settings.jitter_low,
            jitter_high: settings.jitter_high,
            max_delay: settings.max_delay_ms.map(Duration::from_millis),
        }
    }

    pub fn base_for(&self, reason: Backoff) -> Duration {
        match reason {
            Backoff::Transient => self.base_delay,
            Backoff::Throttled => self.slow_base_delay,
            Backoff::Unparsable => self.parse_base_delay,
        }
    }

    /// Delay after the given 1-based attempt for a fixed jitter factor:
    /// `base * growth^(attempt-1) * jitter`, capped at `max_delay`.
    pub fn delay_with_jitter(&self, reason: Backoff, attempt: u32, jitter: f64) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_for(reason).as_secs_f64() * self.growth.powi(exponent) * jitter;
        let delay = Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Delay without jitter noise (jitter factor 1.0).
    pub fn expected_delay(&self, reason: Backoff, attempt: u32) -> Duration {
        self.delay_with_jitter(reason, attempt, 1.0)
    }

    /// Delay with a jitter factor drawn uniformly from `[jitter_low, jitter_high)`.
    pub fn sample_delay(&self, reason: Backoff, attempt: u32) -> Duration {
        let jitter = if self.jitter_high > self.jitter_low {
            rand::rng().random_range(self.jitter_low..self.jitter_high)
        } else {
            self.jitter_low
        };
        self.delay_with_jitter(reason, attempt, jitter)
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed.
    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetrySettings::default())
    }
}
