use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Paces outbound calls so scraped hosts see at most `limit` requests per `window`.
#[derive(Clone)]
pub struct RateGate {
    limiter: Arc<DirectRateLimiter>,
}

impl std::fmt::Debug for RateGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGate").finish_non_exhaustive()
    }
}

impl RateGate {
    pub fn new(window: Duration, limit: u32) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_from_window(window, limit))),
        }
    }

    /// One call per `interval`, no burst.
    pub fn every(interval: Duration) -> Self {
        Self::new(interval, 1)
    }

    /// Gate that never waits.
    pub fn unlimited() -> Self {
        Self::new(Duration::from_millis(1), u32::MAX)
    }

    /// Waits until a permit is available.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

fn quota_from_window(window: Duration, limit: u32) -> Quota {
    let burst = NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN);
    let period = Duration::from_secs_f64((window.as_secs_f64() / f64::from(burst.get())).max(0.000_001));

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn burst_is_served_without_waiting() {
        let gate = RateGate::new(Duration::from_secs(60), 2);

        let started = Instant::now();
        gate.acquire().await;
        gate.acquire().await;

        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn acquire_waits_for_next_permit() {
        let gate = RateGate::every(Duration::from_millis(60));

        gate.acquire().await;
        let started = Instant::now();
        gate.acquire().await;

        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn unlimited_gate_never_waits() {
        let gate = RateGate::unlimited();

        let started = Instant::now();
        for _ in 0..1_000 {
            gate.acquire().await;
        }

        assert!(started.elapsed() < Duration::from_millis(200));
    }
}
