mod api;
mod cache;
mod config;
mod discovery;
mod error;
mod identity;
mod leaderboard;
mod ledger;
mod refresh;
mod retry;
mod types;
mod verifier;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::routes::{router, ApiState};
use crate::cache::ResultCache;
use crate::config::Config;
use crate::error::Result;
use crate::identity::IdentityEnricher;
use crate::ledger::chain::ChainLedger;
use crate::refresh::LeaderboardWarmer;
use crate::retry::RetryPolicy;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // Endpoint and contract addresses are validated here — a malformed value
    // is fatal at startup, never at first query.
    let ledger = ChainLedger::connect(&cfg)?;
    info!("Ledger provider ready at {}", cfg.rpc_url);

    if cfg.identity_api_url.is_none() {
        warn!("IDENTITY_API_URL not set — leaderboard entries will carry truncated-address display names.");
    }

    let retry = RetryPolicy::default();
    let state = ApiState {
        ledger: Arc::new(ledger),
        caps: Arc::new(cfg.caps.clone()),
        retry,
        leaderboard_cache: Arc::new(ResultCache::new()),
        refresh_lock: Arc::new(Mutex::new(())),
        identity: Arc::new(IdentityEnricher::new(cfg.identity_api_url.clone(), retry)),
        health: Arc::new(HealthState::new()),
        latency: Arc::new(LatencyStats::new()),
    };

    // Leaderboard warmer (background: prewarm at startup, then every TTL)
    let warmer = LeaderboardWarmer::new(state.clone());
    tokio::spawn(async move { warmer.run().await });

    // HTTP API server
    let app = router(state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
