//! Request pacing
//!
//! Spaces requests at least `request_delay_ms` apart. With a zero delay the
//! pacer is a no-op.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::debug;

/// Minimum spacing between consecutive requests to one tenant.
pub struct RequestPacer {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    spacing: Duration,
}

impl RequestPacer {
    /// Create a pacer allowing one request per `spacing`.
    pub fn new(spacing: Duration) -> Self {
        let limiter = Quota::with_period(spacing)
            .map(|quota| RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN)));

        Self { limiter, spacing }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Whether pacing is active.
    pub fn is_active(&self) -> bool {
        self.limiter.is_some()
    }

    /// Wait until the next request may go out.
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            if limiter.check().is_err() {
                debug!("Pacing request ({:?} spacing)", self.spacing);
                limiter.until_ready().await;
            }
        }
    }
}

impl Default for RequestPacer {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}
