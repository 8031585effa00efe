//! Retry policy for idempotent reads
//!
//! Only GET requests are retried. Mutations go out exactly once so a timeout
//! after the server committed a create cannot produce a duplicate.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::Preferences;

/// Statuses worth retrying: throttling and transient gateway failures.
pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Upper bound on a single backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Exponential backoff settings for GET requests
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first request
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_backoff: Duration,
    /// Cap applied to every computed or server-supplied delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn from_preferences(prefs: &Preferences) -> Self {
        Self {
            max_attempts: prefs.max_attempts.max(1),
            initial_backoff: Duration::from_millis(prefs.initial_backoff_ms),
            max_backoff: MAX_BACKOFF,
        }
    }

    /// A policy that never retries.
    #[cfg(test)]
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Whether a response status should be retried.
    pub fn is_retryable(&self, status: u16) -> bool {
        RETRY_STATUSES.contains(&status)
    }

    /// Whether another attempt is allowed after `attempt` attempts.
    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay after the given failed attempt (1-based): `initial * 2^(attempt-1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.initial_backoff.saturating_mul(1u32 << exponent);
        delay.min(self.max_backoff)
    }

    /// Pick the delay for a retry, preferring a server-supplied `Retry-After`.
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(d) => d.min(self.max_backoff),
            None => self.backoff(attempt),
        }
    }
}

/// Parse a `Retry-After` header value.
///
/// Accepts delay-seconds (`120`) and HTTP-date
/// (`Wed, 21 Oct 2015 07:28:00 GMT`) forms. Dates in the past yield zero.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?;
    let remaining = at.with_timezone(&Utc) - Utc::now();
    Some(remaining.to_std().unwrap_or(Duration::ZERO))
}
