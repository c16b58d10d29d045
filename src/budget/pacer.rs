//! Local request pacing.
//!
//! A token bucket in front of every outgoing request, independent of the
//! quota the platform reports. Useful when several processes share one
//! credential and the remote quota alone reacts too late.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

type DirectLimiter = GovLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Requests-per-second limiter shared by every clone.
#[derive(Clone)]
pub struct RequestPacer {
    limiter: Arc<DirectLimiter>,
}

impl RequestPacer {
    /// Create a pacer spacing requests evenly at `rate` per second.
    ///
    /// Returns `None` for a rate of 0, which means unlimited.
    pub fn new(rate: u32) -> Option<Self> {
        let rate = NonZeroU32::new(rate)?;
        let quota = Quota::per_second(rate).allow_burst(nonzero!(1u32));
        Some(Self {
            limiter: Arc::new(GovLimiter::direct(quota)),
        })
    }

    /// Wait until a token is available.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rate_is_unlimited() {
        assert!(RequestPacer::new(0).is_none());
    }

    #[tokio::test]
    async fn test_pacer_wait_with_high_rate() {
        let pacer = RequestPacer::new(1000).unwrap();
        pacer.wait().await;
    }

    #[tokio::test]
    async fn test_clones_share_spacing() {
        let first = RequestPacer::new(10).unwrap();
        let second = first.clone();

        let started = std::time::Instant::now();
        first.wait().await;
        second.wait().await;
        second.wait().await;
        assert!(started.elapsed() >= std::time::Duration::from_millis(150));
    }
}
