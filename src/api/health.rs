//! Shared health state for the /health endpoint.
//! Updated by the leaderboard refresh path and request handlers, read by API.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Shared health metrics. Refresh and query paths update, API reads.
#[derive(Default)]
pub struct HealthState {
    /// Nanosecond timestamp of the last successful leaderboard refresh
    /// (0 = never refreshed).
    pub last_refresh_at_ns: AtomicU64,
    /// Consecutive failed leaderboard refreshes; reset on success.
    pub refresh_failures: AtomicU64,
    /// True when the most recent /leaderboard response came from an expired
    /// cache entry.
    pub serving_stale: AtomicBool,
    /// Total claimable-winnings queries handled since startup.
    pub winnings_queries: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_last_refresh_at_ns(&self, ns: u64) {
        self.last_refresh_at_ns.store(ns, Ordering::Relaxed);
    }

    pub fn inc_refresh_failures(&self) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset_refresh_failures(&self) {
        self.refresh_failures.store(0, Ordering::Relaxed);
    }

    pub fn set_serving_stale(&self, v: bool) {
        self.serving_stale.store(v, Ordering::Relaxed);
    }

    pub fn inc_winnings_queries(&self) {
        self.winnings_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_refresh_at_ns(&self) -> u64 {
        self.last_refresh_at_ns.load(Ordering::Relaxed)
    }

    pub fn refresh_failures(&self) -> u64 {
        self.refresh_failures.load(Ordering::Relaxed)
    }

    pub fn serving_stale(&self) -> bool {
        self.serving_stale.load(Ordering::Relaxed)
    }

    pub fn winnings_queries(&self) -> u64 {
        self.winnings_queries.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_accumulate_and_reset_on_success() {
        let health = HealthState::new();
        health.inc_refresh_failures();
        health.inc_refresh_failures();
        assert_eq!(health.refresh_failures(), 2);

        health.reset_refresh_failures();
        health.set_last_refresh_at_ns(42);
        assert_eq!(health.refresh_failures(), 0);
        assert_eq!(health.last_refresh_at_ns(), 42);
    }
}
