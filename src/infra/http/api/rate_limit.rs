use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Per-client sliding window.
#[derive(Debug, Clone)]
pub struct ApiRateLimiter {
    window: Duration,
    max_requests: u32,
    buckets: Arc<DashMap<String, Vec<Instant>>>,
}

impl ApiRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            buckets: Arc::new(DashMap::new()),
        }
    }

    pub fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        let window = self.window;
        let mut entry = self.buckets.entry(client.to_string()).or_default();
        entry.retain(|instant| now.duration_since(*instant) < window);

        let used = u32::try_from(entry.len()).unwrap_or(u32::MAX);
        if used >= self.max_requests {
            // The oldest hit leaves the window first.
            let retry_after = entry
                .first()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            return RateDecision::Limited { retry_after };
        }

        entry.push(now);
        RateDecision::Allowed {
            remaining: self.max_requests - used - 1,
        }
    }

    /// Drop clients whose window has fully elapsed.
    pub fn purge_idle(&self) {
        let now = Instant::now();
        let window = self.window;
        self.buckets.retain(|_, hits| {
            hits.last()
                .is_some_and(|last| now.duration_since(*last) < window)
        });
    }

    pub fn limit(&self) -> u32 {
        self.max_requests
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }
}
