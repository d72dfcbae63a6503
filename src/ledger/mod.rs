//! Remote ledger read/simulate interface.
//!
//! Every read is point-in-time against the ledger's current head; nothing is
//! transactional across calls. The pipeline depends only on [`LedgerReader`],
//! so tests script a [`mock::MockLedger`] instead of a chain.

pub mod chain;
pub mod contracts;
#[cfg(test)]
pub mod mock;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    ClaimSimulation, LeaderboardRow, MarketHandle, MarketStatus, Portfolio, ResolutionMeta,
    TradeRecord,
};

#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Total markets ever created on the v2 contract.
    async fn market_count(&self) -> Result<u64>;

    async fn market_status(&self, market: MarketHandle) -> Result<MarketStatus>;

    async fn resolution_meta(&self, market: MarketHandle) -> Result<ResolutionMeta>;

    async fn option_share_balance(
        &self,
        market: MarketHandle,
        option: u32,
        wallet: Address,
    ) -> Result<U256>;

    /// Read one entry of a wallet's trade-history ledger. The remote contract
    /// reverts past the end of the sequence — callers interpret an error here
    /// as end-of-sequence, not as a fault (see `discovery`).
    async fn trade_history_entry(&self, wallet: Address, index: u64) -> Result<TradeRecord>;

    /// One page of the v1 contract's native leaderboard.
    async fn leaderboard_page(&self, offset: u64, size: u64) -> Result<Vec<LeaderboardRow>>;

    /// Positional read of the v2 participants index. `Ok(None)` means the
    /// index holds no entry at this position (end of the index).
    async fn participant_at(&self, index: u64) -> Result<Option<Address>>;

    async fn portfolio(&self, wallet: Address) -> Result<Portfolio>;

    async fn payout_per_share(&self) -> Result<U256>;

    async fn token_decimals(&self) -> Result<u8>;

    /// Dry-run the settlement operation as `wallet`, discarding any state
    /// change. Transport faults surface as `Err`; a revert surfaces as
    /// `Ok(Rejected(_))` with the classified reason.
    async fn simulate_claim(&self, market: MarketHandle, wallet: Address)
        -> Result<ClaimSimulation>;
}
