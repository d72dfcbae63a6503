//! Time-boxed memoization with stale-on-error fallback.
//!
//! Expired entries are retained, not evicted: when a refresh fails the caller
//! can still serve the last known value. Process lifetime only — nothing
//! survives a restart.

use std::time::{Duration, Instant};

use dashmap::DashMap;

struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

/// Keyed by logical query name. Keys carry a version suffix (for example
/// `leaderboard:v2`) so a shape change in the producer invalidates all prior
/// entries without coordination.
pub struct ResultCache<T: Clone> {
    entries: DashMap<String, CacheEntry<T>>,
}

impl<T: Clone> ResultCache<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Value if present and within TTL.
    pub fn get_fresh(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        if Instant::now() < entry.expires_at {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Value regardless of expiry, with a staleness flag. Distinguishes
    /// "no data" (None) from "stale but available" — the caller decides
    /// whether stale is acceptable.
    pub fn get_any(&self, key: &str) -> Option<(T, bool)> {
        let entry = self.entries.get(key)?;
        let stale = Instant::now() >= entry.expires_at;
        Some((entry.value.clone(), stale))
    }

    pub fn set(&self, key: &str, value: T, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

impl<T: Clone> Default for ResultCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
