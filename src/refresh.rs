//! Background leaderboard warmer.
//! Prewarms the cache at startup and rebuilds on the TTL cadence so steady
//! traffic rarely pays the full aggregation latency on a request.

use std::time::Duration;

use tokio::time::interval;
use tracing::error;

use crate::api::routes::{refresh_leaderboard, ApiState};
use crate::config::{LEADERBOARD_CACHE_KEY, LEADERBOARD_TTL_SECS};

pub struct LeaderboardWarmer {
    state: ApiState,
}

impl LeaderboardWarmer {
    pub fn new(state: ApiState) -> Self {
        Self { state }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(LEADERBOARD_TTL_SECS));
        loop {
            // First tick fires immediately — the prewarm.
            ticker.tick().await;
            self.tick().await;
        }
    }

    async fn tick(&self) {
        let _guard = self.state.refresh_lock.lock().await;
        // A request may have rebuilt the table while we waited on the lock.
        if self
            .state
            .leaderboard_cache
            .get_fresh(LEADERBOARD_CACHE_KEY)
            .is_some()
        {
            return;
        }
        if let Err(e) = refresh_leaderboard(&self.state).await {
            self.state.health.inc_refresh_failures();
            error!("Leaderboard warm refresh failed: {e}");
        }
    }
}
