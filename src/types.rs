use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Opaque per-generation market identifier. Monotonically increasing, never
/// reused, immutable once assigned by the remote ledger.
pub type MarketHandle = u64;

// ---------------------------------------------------------------------------
// Contract generations
// ---------------------------------------------------------------------------

/// One of the two independently deployed market ledgers that must be merged
/// for a unified view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    /// Legacy binary-outcome contract with a native leaderboard getter.
    V1,
    /// Multi-option contract: trade history, participants index, portfolios.
    V2,
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Generation::V1 => write!(f, "v1"),
            Generation::V2 => write!(f, "v2"),
        }
    }
}

// ---------------------------------------------------------------------------
// Point-in-time ledger reads
// ---------------------------------------------------------------------------

/// Snapshot of a market's lifecycle flags. Valid only at the block it was read
/// against — the ledger can move between reads.
#[derive(Debug, Clone, Copy)]
pub struct MarketStatus {
    pub resolved: bool,
    pub invalidated: bool,
    pub winning_option: u32,
    pub option_count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolutionMeta {
    pub disputed: bool,
    pub resolved_at: u64,
}

/// One entry of a wallet's trade-history ledger.
#[derive(Debug, Clone, Copy)]
pub struct TradeRecord {
    pub market: MarketHandle,
    pub option: u32,
    pub shares: U256,
}

/// Cumulative per-wallet totals kept by the v2 contract.
#[derive(Debug, Clone, Copy)]
pub struct Portfolio {
    pub total_winnings: U256,
    pub trade_count: u64,
}

/// One row of the v1 contract's native leaderboard getter.
#[derive(Debug, Clone, Copy)]
pub struct LeaderboardRow {
    pub wallet: Address,
    pub total_winnings: U256,
    pub trade_count: u64,
}

// ---------------------------------------------------------------------------
// Speculative claim outcome
// ---------------------------------------------------------------------------

/// Result of dry-running the settlement operation against current state.
/// "Already claimed" is not observable through any read-only query, so the
/// simulation is the authority on claimability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimSimulation {
    Accepted,
    Rejected(ClaimRejection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimRejection {
    AlreadyClaimed,
    NoWinningShares,
    NotFinalized,
    Other(String),
}

impl std::fmt::Display for ClaimRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimRejection::AlreadyClaimed => write!(f, "already_claimed"),
            ClaimRejection::NoWinningShares => write!(f, "no_winning_shares"),
            ClaimRejection::NotFinalized => write!(f, "not_finalized"),
            ClaimRejection::Other(reason) => write!(f, "other: {reason}"),
        }
    }
}

// ---------------------------------------------------------------------------
// API-facing aggregates
// ---------------------------------------------------------------------------

/// Derived fact: the wallet holds an unclaimed winning position in `market`.
/// Never persisted as truth — re-derived per query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimEligibility {
    pub market: MarketHandle,
    pub wallet: String,
    /// Raw fixed-point amount as a decimal string (no precision loss).
    pub amount: String,
    pub claimable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub wallet: String,
    /// Display-scale winnings, converted by the payment token's decimals.
    pub total_winnings: f64,
    pub trade_count: u64,
    pub identity: Option<Identity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub display_name: String,
    pub numeric_id: Option<u64>,
    pub avatar_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Lowercase 0x-prefixed rendering, the canonical wallet key in API output.
pub fn address_string(addr: &Address) -> String {
    format!("{addr:#x}")
}

/// Convert a raw fixed-point amount to display scale. Amounts far beyond f64
/// precision lose low digits, which is acceptable for a display value.
pub fn to_display_amount(amount: U256, decimals: u8) -> f64 {
    let raw: f64 = amount.to_string().parse().unwrap_or(0.0);
    raw / 10f64.powi(i32::from(decimals))
}
