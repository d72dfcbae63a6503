use std::time::Duration;

use crate::error::{AppError, Result};

/// Trade-history walk stops at this index even if the remote sequence keeps
/// answering. Bounds cost against a misbehaving or unbounded remote state.
pub const MAX_TRADE_HISTORY: u64 = 100;

/// Fallback balance scan never looks past this many markets.
pub const MAX_FALLBACK_MARKETS: u64 = 300;

/// Page size for the legacy (v1) leaderboard getter.
pub const LEADERBOARD_PAGE_SIZE: u64 = 50;

/// Concurrent reads per batch when enumerating the v2 participants index.
pub const PARTICIPANT_BATCH_SIZE: usize = 20;

/// Participants index enumeration hard cap (indices, not batches).
pub const MAX_PARTICIPANTS: u64 = 2000;

/// Concurrent portfolio reads per batch.
pub const PORTFOLIO_BATCH_SIZE: usize = 10;

/// Leaderboard rows returned to callers.
pub const LEADERBOARD_TOP_N: usize = 10;

/// Addresses per identity-service lookup request.
pub const IDENTITY_CHUNK_SIZE: usize = 50;

/// Leaderboard cache TTL (seconds). Entries older than this are stale but are
/// retained and served if a refresh fails.
pub const LEADERBOARD_TTL_SECS: u64 = 300;

/// Identity cache TTL (seconds). Identities change rarely.
pub const IDENTITY_TTL_SECS: u64 = 86_400;

/// Versioned cache key — bump the suffix when the aggregation output changes
/// shape so prior entries are never deserialized into the new one.
pub const LEADERBOARD_CACHE_KEY: &str = "leaderboard:v2";

/// Retry policy defaults.
pub const RETRY_MAX_ATTEMPTS: u32 = 3;
pub const RETRY_BASE_DELAY_MS: u64 = 500;
/// Rate-limited failures wait at least this long regardless of the
/// exponential schedule.
pub const RATE_LIMIT_FLOOR_SECS: u64 = 10;

/// Wall-clock budget for one claimable-winnings pipeline run. On expiry the
/// pipeline returns whatever it has gathered rather than failing closed.
pub const PIPELINE_TIMEOUT_SECS: u64 = 25;

/// Shares are stored in fixed point with 6 decimal places; payout amounts are
/// `shares * payout_per_share / SHARE_SCALE`.
pub const SHARE_SCALE: u64 = 1_000_000;

/// Used when the one-per-batch `payoutPerShare` read fails. The value is
/// expected to be invariant across the contract's lifetime (1 token unit per
/// winning share at 6 decimals).
pub const DEFAULT_PAYOUT_PER_SHARE: u64 = 1_000_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    /// Legacy binary-outcome market contract (generation 1).
    pub market_v1_address: String,
    /// Multi-option market contract (generation 2).
    pub market_v2_address: String,
    /// Payment token contract, read once for its decimal count.
    pub token_address: String,
    pub identity_api_url: Option<String>,
    pub log_level: String,
    pub api_port: u16,
    pub caps: ScanCaps,
}

/// Exploration caps and page sizes, injectable so tests run with small limits
/// instead of 100/300.
#[derive(Debug, Clone)]
pub struct ScanCaps {
    pub max_trade_history: u64,
    pub max_fallback_markets: u64,
    pub leaderboard_page_size: u64,
    pub participant_batch_size: usize,
    pub max_participants: u64,
    pub portfolio_batch_size: usize,
    pub leaderboard_top_n: usize,
    pub pipeline_timeout: Duration,
}

impl Default for ScanCaps {
    fn default() -> Self {
        Self {
            max_trade_history: MAX_TRADE_HISTORY,
            max_fallback_markets: MAX_FALLBACK_MARKETS,
            leaderboard_page_size: LEADERBOARD_PAGE_SIZE,
            participant_batch_size: PARTICIPANT_BATCH_SIZE,
            max_participants: MAX_PARTICIPANTS,
            portfolio_batch_size: PORTFOLIO_BATCH_SIZE,
            leaderboard_top_n: LEADERBOARD_TOP_N,
            pipeline_timeout: Duration::from_secs(PIPELINE_TIMEOUT_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let rpc_url = std::env::var("RPC_URL")
            .map_err(|_| AppError::Config("RPC_URL must be set".to_string()))?;
        let market_v1_address = std::env::var("MARKET_V1_ADDRESS")
            .map_err(|_| AppError::Config("MARKET_V1_ADDRESS must be set".to_string()))?;
        let market_v2_address = std::env::var("MARKET_V2_ADDRESS")
            .map_err(|_| AppError::Config("MARKET_V2_ADDRESS must be set".to_string()))?;
        let token_address = std::env::var("TOKEN_ADDRESS")
            .map_err(|_| AppError::Config("TOKEN_ADDRESS must be set".to_string()))?;

        Ok(Self {
            rpc_url,
            market_v1_address,
            market_v2_address,
            token_address,
            identity_api_url: std::env::var("IDENTITY_API_URL").ok().filter(|s| !s.is_empty()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            caps: ScanCaps {
                max_trade_history: env_u64("MAX_TRADE_HISTORY", MAX_TRADE_HISTORY),
                max_fallback_markets: env_u64("MAX_FALLBACK_MARKETS", MAX_FALLBACK_MARKETS),
                leaderboard_page_size: env_u64("LEADERBOARD_PAGE_SIZE", LEADERBOARD_PAGE_SIZE),
                participant_batch_size: env_u64(
                    "PARTICIPANT_BATCH_SIZE",
                    PARTICIPANT_BATCH_SIZE as u64,
                ) as usize,
                max_participants: env_u64("MAX_PARTICIPANTS", MAX_PARTICIPANTS),
                portfolio_batch_size: env_u64("PORTFOLIO_BATCH_SIZE", PORTFOLIO_BATCH_SIZE as u64)
                    as usize,
                leaderboard_top_n: env_u64("LEADERBOARD_TOP_N", LEADERBOARD_TOP_N as u64) as usize,
                pipeline_timeout: Duration::from_secs(env_u64(
                    "PIPELINE_TIMEOUT_SECS",
                    PIPELINE_TIMEOUT_SECS,
                )),
            },
        })
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}
