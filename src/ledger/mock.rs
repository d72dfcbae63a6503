//! Scriptable in-memory ledger shared by the pipeline tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::ledger::LedgerReader;
use crate::types::{
    ClaimSimulation, LeaderboardRow, MarketHandle, MarketStatus, Portfolio, ResolutionMeta,
    TradeRecord,
};

pub fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

#[derive(Default)]
pub struct CallCounters {
    pub trade_history_reads: AtomicU64,
    pub balance_reads: AtomicU64,
    pub status_reads: AtomicU64,
    pub participant_reads: AtomicU64,
    pub leaderboard_page_reads: AtomicU64,
    pub portfolio_reads: AtomicU64,
    pub simulate_calls: AtomicU64,
    pub payout_reads: AtomicU64,
}

#[derive(Default)]
pub struct MockLedger {
    pub market_count: u64,
    pub trade_history: HashMap<Address, Vec<TradeRecord>>,
    pub statuses: HashMap<MarketHandle, MarketStatus>,
    pub resolutions: HashMap<MarketHandle, ResolutionMeta>,
    pub balances: HashMap<(MarketHandle, u32, Address), U256>,
    pub leaderboard_rows: Vec<LeaderboardRow>,
    /// Positional participants index. `None` is a hole — an absent entry.
    pub participants: Vec<Option<Address>>,
    pub portfolios: HashMap<Address, Portfolio>,
    /// `None` makes the read fail (exercises the hardcoded fallback).
    pub payout_per_share: Option<U256>,
    pub decimals: u8,
    pub fail_decimals: AtomicBool,
    /// Fail the next N leaderboard page reads before succeeding.
    pub fail_leaderboard_pages: AtomicU64,
    /// Participant indices whose reads fail (transport-style fault).
    pub fail_participant_at: HashSet<u64>,
    /// Unscripted claims are accepted; script rejections or faults here.
    pub claim_outcomes: HashMap<(MarketHandle, Address), ClaimSimulation>,
    pub fail_simulate: HashSet<(MarketHandle, Address)>,
    pub fail_status: HashSet<MarketHandle>,
    pub calls: CallCounters,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            decimals: 6,
            payout_per_share: Some(U256::from(1_000_000u64)),
            ..Self::default()
        }
    }

    pub fn trade(market: MarketHandle) -> TradeRecord {
        TradeRecord {
            market,
            option: 0,
            shares: U256::from(1u64),
        }
    }

    pub fn resolved_status(winning_option: u32, option_count: u32) -> MarketStatus {
        MarketStatus {
            resolved: true,
            invalidated: false,
            winning_option,
            option_count,
        }
    }
}

#[async_trait]
impl LedgerReader for MockLedger {
    async fn market_count(&self) -> Result<u64> {
        Ok(self.market_count)
    }

    async fn market_status(&self, market: MarketHandle) -> Result<MarketStatus> {
        self.calls.status_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_status.contains(&market) {
            return Err(AppError::Ledger(format!("status read failed for {market}")));
        }
        self.statuses
            .get(&market)
            .copied()
            .ok_or_else(|| AppError::Ledger(format!("unknown market {market}")))
    }

    async fn resolution_meta(&self, market: MarketHandle) -> Result<ResolutionMeta> {
        Ok(self
            .resolutions
            .get(&market)
            .copied()
            .unwrap_or(ResolutionMeta {
                disputed: false,
                resolved_at: 1,
            }))
    }

    async fn option_share_balance(
        &self,
        market: MarketHandle,
        option: u32,
        wallet: Address,
    ) -> Result<U256> {
        self.calls.balance_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .balances
            .get(&(market, option, wallet))
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn trade_history_entry(&self, wallet: Address, index: u64) -> Result<TradeRecord> {
        self.calls.trade_history_reads.fetch_add(1, Ordering::SeqCst);
        self.trade_history
            .get(&wallet)
            .and_then(|h| h.get(index as usize))
            .copied()
            .ok_or_else(|| AppError::Ledger("execution reverted: index out of bounds".into()))
    }

    async fn leaderboard_page(&self, offset: u64, size: u64) -> Result<Vec<LeaderboardRow>> {
        self.calls.leaderboard_page_reads.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_leaderboard_pages.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_leaderboard_pages.store(remaining - 1, Ordering::SeqCst);
            return Err(AppError::Ledger("HTTP 429 too many requests".into()));
        }
        let start = (offset as usize).min(self.leaderboard_rows.len());
        let end = (start + size as usize).min(self.leaderboard_rows.len());
        Ok(self.leaderboard_rows[start..end].to_vec())
    }

    async fn participant_at(&self, index: u64) -> Result<Option<Address>> {
        self.calls.participant_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_participant_at.contains(&index) {
            return Err(AppError::Ledger("connection reset by peer".into()));
        }
        Ok(self
            .participants
            .get(index as usize)
            .copied()
            .flatten())
    }

    async fn portfolio(&self, wallet: Address) -> Result<Portfolio> {
        self.calls.portfolio_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.portfolios.get(&wallet).copied().unwrap_or(Portfolio {
            total_winnings: U256::ZERO,
            trade_count: 0,
        }))
    }

    async fn payout_per_share(&self) -> Result<U256> {
        self.calls.payout_reads.fetch_add(1, Ordering::SeqCst);
        self.payout_per_share
            .ok_or_else(|| AppError::Ledger("payoutPerShare read failed".into()))
    }

    async fn token_decimals(&self) -> Result<u8> {
        if self.fail_decimals.load(Ordering::SeqCst) {
            return Err(AppError::Ledger("decimals read failed".into()));
        }
        Ok(self.decimals)
    }

    async fn simulate_claim(
        &self,
        market: MarketHandle,
        wallet: Address,
    ) -> Result<ClaimSimulation> {
        self.calls.simulate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_simulate.contains(&(market, wallet)) {
            return Err(AppError::Ledger("request timed out".into()));
        }
        Ok(self
            .claim_outcomes
            .get(&(market, wallet))
            .cloned()
            .unwrap_or(ClaimSimulation::Accepted))
    }
}
