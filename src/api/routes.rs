use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy::primitives::Address;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::cache::ResultCache;
use crate::config::{ScanCaps, LEADERBOARD_CACHE_KEY, LEADERBOARD_TTL_SECS};
use crate::discovery::discover;
use crate::error::AppError;
use crate::identity::IdentityEnricher;
use crate::leaderboard::aggregate;
use crate::ledger::LedgerReader;
use crate::retry::RetryPolicy;
use crate::types::{address_string, ClaimEligibility, LeaderboardEntry, MarketHandle};
use crate::verifier::verify;

#[derive(Clone)]
pub struct ApiState {
    pub ledger: Arc<dyn LedgerReader>,
    pub caps: Arc<ScanCaps>,
    pub retry: RetryPolicy,
    pub leaderboard_cache: Arc<ResultCache<Vec<LeaderboardEntry>>>,
    /// Serializes leaderboard refreshes: concurrent cache misses produce one
    /// rebuild, the rest wait and re-read.
    pub refresh_lock: Arc<Mutex<()>>,
    pub identity: Arc<IdentityEnricher>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/wallets/:wallet/winnings", get(get_wallet_winnings))
        .route("/leaderboard", get(get_leaderboard))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct WinningsResponse {
    pub wallet: String,
    pub participated_markets: Vec<MarketHandle>,
    pub winnings: Vec<ClaimEligibility>,
}

#[derive(Serialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
    /// True when a refresh failed and an expired cached table was served.
    pub stale: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_wallet_winnings(
    State(state): State<ApiState>,
    Path(wallet): Path<String>,
) -> Result<Json<WinningsResponse>, AppError> {
    let address: Address = wallet
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid wallet address: {wallet}")))?;

    state.health.inc_winnings_queries();
    let started = tokio::time::Instant::now();
    let deadline = started + state.caps.pipeline_timeout;

    let markets = discover(state.ledger.as_ref(), &state.retry, &state.caps, address).await?;
    let winnings = verify(state.ledger.as_ref(), &state.retry, address, &markets, deadline).await;

    state.latency.record(started.elapsed());
    Ok(Json(WinningsResponse {
        wallet: address_string(&address),
        participated_markets: markets,
        winnings,
    }))
}

async fn get_leaderboard(
    State(state): State<ApiState>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let (entries, stale) = leaderboard_with_fallback(&state).await?;
    state.health.set_serving_stale(stale);
    Ok(Json(LeaderboardResponse { entries, stale }))
}

async fn get_health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "last_refresh_at_ns": state.health.last_refresh_at_ns(),
        "refresh_failures": state.health.refresh_failures(),
        "serving_stale": state.health.serving_stale(),
        "winnings_queries": state.health.winnings_queries(),
    }))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let (p50, p95, p99) = state.latency.percentiles();
    Json(serde_json::json!({
        "samples": state.latency.len(),
        "p50_us": p50,
        "p95_us": p95,
        "p99_us": p99,
    }))
}

// ---------------------------------------------------------------------------
// Leaderboard refresh path
// ---------------------------------------------------------------------------

/// Cache-first leaderboard read. On a miss, exactly one caller rebuilds under
/// the refresh lock; a failed rebuild falls back to the expired entry if one
/// exists, and only a failure with an empty cache surfaces an error.
pub(crate) async fn leaderboard_with_fallback(
    state: &ApiState,
) -> Result<(Vec<LeaderboardEntry>, bool), AppError> {
    if let Some(entries) = state.leaderboard_cache.get_fresh(LEADERBOARD_CACHE_KEY) {
        return Ok((entries, false));
    }

    let _guard = state.refresh_lock.lock().await;
    // A waiter may find the cache repopulated by the refresh it waited on.
    if let Some(entries) = state.leaderboard_cache.get_fresh(LEADERBOARD_CACHE_KEY) {
        return Ok((entries, false));
    }

    match refresh_leaderboard(state).await {
        Ok(entries) => Ok((entries, false)),
        Err(e) => {
            warn!("leaderboard refresh failed: {e}");
            state.health.inc_refresh_failures();
            match state.leaderboard_cache.get_any(LEADERBOARD_CACHE_KEY) {
                Some((entries, _)) => Ok((entries, true)),
                None => Err(AppError::Unavailable(
                    "leaderboard refresh failed and no cached copy exists".to_string(),
                )),
            }
        }
    }
}

/// Rebuild the table wholesale, attach identities, store under the versioned
/// key. Callers hold the refresh lock.
pub(crate) async fn refresh_leaderboard(
    state: &ApiState,
) -> Result<Vec<LeaderboardEntry>, AppError> {
    let started = tokio::time::Instant::now();
    let mut entries = aggregate(state.ledger.as_ref(), &state.retry, &state.caps).await?;

    let wallets: Vec<String> = entries.iter().map(|e| e.wallet.clone()).collect();
    let identities = state.identity.enrich(&wallets).await;
    for entry in &mut entries {
        entry.identity = identities.get(&entry.wallet).cloned();
    }

    state.leaderboard_cache.set(
        LEADERBOARD_CACHE_KEY,
        entries.clone(),
        Duration::from_secs(LEADERBOARD_TTL_SECS),
    );
    state.health.set_last_refresh_at_ns(now_ns());
    state.health.reset_refresh_failures();
    info!(
        entries = entries.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "leaderboard refreshed",
    );
    Ok(entries)
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
