//! Participation discovery — which markets has a wallet ever touched?
//!
//! The remote ledger keeps no per-wallet market index, so the set is
//! reconstructed from the trade-history sequence, with a full balance scan as
//! a correctness backstop when the history is absent or incomplete.

use std::collections::BTreeSet;

use alloy::primitives::{Address, U256};
use tracing::{debug, info};

use crate::config::ScanCaps;
use crate::error::Result;
use crate::ledger::LedgerReader;
use crate::retry::{with_retries, RetryPolicy};
use crate::types::MarketHandle;

/// Markets the wallet has participated in, deduplicated, ascending.
///
/// Primary strategy: walk the trade-history ledger sequentially from index 0.
/// The contract reverts past the end of the sequence, so a failed read is the
/// end-of-sequence signal: it is neither retried nor surfaced as a fault.
/// The walk is capped to bound cost against an unbounded remote state.
///
/// Fallback strategy: only when the primary yields nothing, scan resolved
/// markets up to a cap and check every option's balance. O(markets × options),
/// so it must never run when the primary succeeded.
pub async fn discover(
    ledger: &dyn LedgerReader,
    retry: &RetryPolicy,
    caps: &ScanCaps,
    wallet: Address,
) -> Result<Vec<MarketHandle>> {
    let mut seen: BTreeSet<MarketHandle> = BTreeSet::new();

    // Reads are strictly sequential: each read's termination condition depends
    // on the previous one existing.
    for index in 0..caps.max_trade_history {
        match ledger.trade_history_entry(wallet, index).await {
            Ok(record) => {
                seen.insert(record.market);
            }
            Err(e) => {
                debug!("trade history ends at index {index} for {wallet:#x}: {e}");
                break;
            }
        }
    }

    if !seen.is_empty() {
        return Ok(seen.into_iter().collect());
    }

    debug!("no trade history for {wallet:#x}, falling back to balance scan");
    let count = with_retries("market_count", retry, || ledger.market_count()).await?;
    let scan_limit = count.min(caps.max_fallback_markets);

    for market in 0..scan_limit {
        let status = match ledger.market_status(market).await {
            Ok(s) => s,
            Err(e) => {
                debug!("skipping market {market} in fallback scan: {e}");
                continue;
            }
        };
        if !status.resolved {
            continue;
        }

        for option in 0..status.option_count {
            match ledger.option_share_balance(market, option, wallet).await {
                Ok(balance) if balance > U256::ZERO => {
                    seen.insert(market);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("balance read failed for market {market} option {option}: {e}");
                }
            }
        }
    }

    if !seen.is_empty() {
        info!(
            wallet = %format!("{wallet:#x}"),
            markets = seen.len(),
            "fallback scan recovered participation the trade history missed",
        );
    }

    Ok(seen.into_iter().collect())
}
