//! Production [`LedgerReader`] over a JSON-RPC HTTP provider. All reads are
//! `eth_call`; the speculative claim is the same `claim` the settlement UI
//! sends, executed as a dry-run with `from` set to the queried wallet.

use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use async_trait::async_trait;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::ledger::contracts::{IERC20Meta, IMarketV1, IMarketV2};
use crate::ledger::LedgerReader;
use crate::types::{
    ClaimRejection, ClaimSimulation, LeaderboardRow, MarketHandle, MarketStatus, Portfolio,
    ResolutionMeta, TradeRecord,
};

pub struct ChainLedger {
    provider: DynProvider,
    v1_address: Address,
    v2_address: Address,
    token_address: Address,
}

impl ChainLedger {
    /// Build from config. Malformed endpoints or addresses are terminal
    /// configuration faults — surfaced here at startup, never retried.
    pub fn connect(cfg: &Config) -> Result<Self> {
        let rpc_url = cfg
            .rpc_url
            .parse()
            .map_err(|e| AppError::Config(format!("invalid RPC_URL: {e}")))?;
        let provider = ProviderBuilder::new().connect_http(rpc_url).erased();

        Ok(Self {
            provider,
            v1_address: parse_address("MARKET_V1_ADDRESS", &cfg.market_v1_address)?,
            v2_address: parse_address("MARKET_V2_ADDRESS", &cfg.market_v2_address)?,
            token_address: parse_address("TOKEN_ADDRESS", &cfg.token_address)?,
        })
    }

    fn v1(&self) -> IMarketV1::IMarketV1Instance<DynProvider> {
        IMarketV1::new(self.v1_address, self.provider.clone())
    }

    fn v2(&self) -> IMarketV2::IMarketV2Instance<DynProvider> {
        IMarketV2::new(self.v2_address, self.provider.clone())
    }
}

fn parse_address(name: &str, value: &str) -> Result<Address> {
    value
        .parse()
        .map_err(|e| AppError::Config(format!("invalid {name}: {e}")))
}

fn ledger_err(e: impl std::fmt::Display) -> AppError {
    AppError::Ledger(e.to_string())
}

/// Does this call failure carry a contract revert (as opposed to a transport
/// or provider fault)?
fn is_revert(msg: &str) -> bool {
    let msg = msg.to_ascii_lowercase();
    msg.contains("revert") || msg.contains("execution error")
}

/// Map a claim revert reason onto the rejection taxonomy. Unknown reasons are
/// carried verbatim — the verifier treats all of them as "not claimable".
pub(crate) fn classify_rejection(msg: &str) -> ClaimRejection {
    let lower = msg.to_ascii_lowercase();
    if lower.contains("already claimed") {
        ClaimRejection::AlreadyClaimed
    } else if lower.contains("no winning") || lower.contains("nothing to claim") {
        ClaimRejection::NoWinningShares
    } else if lower.contains("not resolved") || lower.contains("not finalized") {
        ClaimRejection::NotFinalized
    } else {
        ClaimRejection::Other(msg.to_string())
    }
}

#[async_trait]
impl LedgerReader for ChainLedger {
    async fn market_count(&self) -> Result<u64> {
        let count = self.v2().marketCount().call().await.map_err(ledger_err)?;
        Ok(count.saturating_to::<u64>())
    }

    async fn market_status(&self, market: MarketHandle) -> Result<MarketStatus> {
        let r = self
            .v2()
            .getMarketStatus(U256::from(market))
            .call()
            .await
            .map_err(ledger_err)?;
        Ok(MarketStatus {
            resolved: r.resolved,
            invalidated: r.invalidated,
            winning_option: r.winningOption.saturating_to::<u32>(),
            option_count: r.optionCount.saturating_to::<u32>(),
        })
    }

    async fn resolution_meta(&self, market: MarketHandle) -> Result<ResolutionMeta> {
        let r = self
            .v2()
            .getResolution(U256::from(market))
            .call()
            .await
            .map_err(ledger_err)?;
        Ok(ResolutionMeta {
            disputed: r.disputed,
            resolved_at: r.resolvedAt.saturating_to::<u64>(),
        })
    }

    async fn option_share_balance(
        &self,
        market: MarketHandle,
        option: u32,
        wallet: Address,
    ) -> Result<U256> {
        self.v2()
            .balanceOf(U256::from(market), U256::from(option), wallet)
            .call()
            .await
            .map_err(ledger_err)
    }

    async fn trade_history_entry(&self, wallet: Address, index: u64) -> Result<TradeRecord> {
        let r = self
            .v2()
            .userTradeAt(wallet, U256::from(index))
            .call()
            .await
            .map_err(ledger_err)?;
        Ok(TradeRecord {
            market: r.marketId.saturating_to::<u64>(),
            option: r.option.saturating_to::<u32>(),
            shares: r.shares,
        })
    }

    async fn leaderboard_page(&self, offset: u64, size: u64) -> Result<Vec<LeaderboardRow>> {
        let r = self
            .v1()
            .getLeaderboard(U256::from(offset), U256::from(size))
            .call()
            .await
            .map_err(ledger_err)?;

        if r.wallets.len() != r.winnings.len() || r.wallets.len() != r.tradeCounts.len() {
            return Err(AppError::Ledger(format!(
                "leaderboard page shape mismatch: {} wallets, {} winnings, {} counts",
                r.wallets.len(),
                r.winnings.len(),
                r.tradeCounts.len(),
            )));
        }

        Ok(r.wallets
            .into_iter()
            .zip(r.winnings)
            .zip(r.tradeCounts)
            .map(|((wallet, total_winnings), counts)| LeaderboardRow {
                wallet,
                total_winnings,
                trade_count: counts.saturating_to::<u64>(),
            })
            .collect())
    }

    async fn participant_at(&self, index: u64) -> Result<Option<Address>> {
        let participant = self
            .v2()
            .participantAt(U256::from(index))
            .call()
            .await
            .map_err(ledger_err)?;
        if participant == Address::ZERO {
            Ok(None)
        } else {
            Ok(Some(participant))
        }
    }

    async fn portfolio(&self, wallet: Address) -> Result<Portfolio> {
        let r = self
            .v2()
            .getPortfolio(wallet)
            .call()
            .await
            .map_err(ledger_err)?;
        Ok(Portfolio {
            total_winnings: r.totalWinnings,
            trade_count: r.tradeCount.saturating_to::<u64>(),
        })
    }

    async fn payout_per_share(&self) -> Result<U256> {
        self.v2().payoutPerShare().call().await.map_err(ledger_err)
    }

    async fn token_decimals(&self) -> Result<u8> {
        IERC20Meta::new(self.token_address, self.provider.clone())
            .decimals()
            .call()
            .await
            .map_err(ledger_err)
    }

    async fn simulate_claim(
        &self,
        market: MarketHandle,
        wallet: Address,
    ) -> Result<ClaimSimulation> {
        let v2 = self.v2();
        let call = v2.claim(U256::from(market)).from(wallet);
        match call.call().await {
            Ok(_) => Ok(ClaimSimulation::Accepted),
            Err(e) => {
                let msg = e.to_string();
                if is_revert(&msg) {
                    Ok(ClaimSimulation::Rejected(classify_rejection(&msg)))
                } else {
                    Err(AppError::Ledger(msg))
                }
            }
        }
    }
}
