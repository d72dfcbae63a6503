//! Claimability verification for a wallet's candidate markets.
//!
//! "Already claimed" is not observable through any read-only query, so the
//! final authority is a speculative claim — a dry-run of the settlement call
//! with the wallet as sender, discarding state. Every per-market failure
//! skips that market only; the batch always returns partial results.

use alloy::primitives::{Address, U256};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::{DEFAULT_PAYOUT_PER_SHARE, SHARE_SCALE};
use crate::ledger::LedgerReader;
use crate::retry::{with_retries, RetryPolicy};
use crate::types::{address_string, ClaimEligibility, ClaimSimulation, MarketHandle};

/// Check each candidate market for an unclaimed winning position. Candidates
/// are processed in order until done or `deadline` passes; whatever has been
/// gathered by then is returned.
pub async fn verify(
    ledger: &dyn LedgerReader,
    retry: &RetryPolicy,
    wallet: Address,
    markets: &[MarketHandle],
    deadline: Instant,
) -> Vec<ClaimEligibility> {
    // payoutPerShare is invariant across the contract's lifetime — read once
    // per batch, fall back to the known constant if the read fails.
    let payout_per_share = match with_retries("payout_per_share", retry, || {
        ledger.payout_per_share()
    })
    .await
    {
        Ok(v) => v,
        Err(e) => {
            warn!("payoutPerShare read failed, using default: {e}");
            U256::from(DEFAULT_PAYOUT_PER_SHARE)
        }
    };

    let mut winnings = Vec::new();

    for (checked, &market) in markets.iter().enumerate() {
        if Instant::now() >= deadline {
            warn!(
                checked,
                remaining = markets.len() - checked,
                "verification deadline reached, returning partial results",
            );
            break;
        }
        if let Some(eligibility) =
            check_market(ledger, retry, wallet, market, payout_per_share).await
        {
            winnings.push(eligibility);
        }
    }

    winnings
}

async fn check_market(
    ledger: &dyn LedgerReader,
    retry: &RetryPolicy,
    wallet: Address,
    market: MarketHandle,
    payout_per_share: U256,
) -> Option<ClaimEligibility> {
    let status = match with_retries("market_status", retry, || ledger.market_status(market)).await
    {
        Ok(s) => s,
        Err(e) => {
            debug!("skipping market {market}: status read failed: {e}");
            return None;
        }
    };
    if !status.resolved || status.invalidated {
        return None;
    }

    let meta =
        match with_retries("resolution_meta", retry, || ledger.resolution_meta(market)).await {
            Ok(m) => m,
            Err(e) => {
                debug!("skipping market {market}: resolution read failed: {e}");
                return None;
            }
        };
    if meta.disputed {
        return None;
    }

    let shares = match with_retries("winning_share_balance", retry, || {
        ledger.option_share_balance(market, status.winning_option, wallet)
    })
    .await
    {
        Ok(b) => b,
        Err(e) => {
            debug!("skipping market {market}: balance read failed: {e}");
            return None;
        }
    };
    if shares == U256::ZERO {
        return None;
    }

    // The dry-run decides. A rejection ("already claimed", "no winning
    // shares", anything else the contract refuses) is a normal negative
    // result for this wallet, never a pipeline error — and so is a
    // retry-exhausted transport fault on the simulation itself.
    match with_retries("simulate_claim", retry, || {
        ledger.simulate_claim(market, wallet)
    })
    .await
    {
        Ok(ClaimSimulation::Accepted) => {
            let amount = shares * payout_per_share / U256::from(SHARE_SCALE);
            Some(ClaimEligibility {
                market,
                wallet: address_string(&wallet),
                amount: amount.to_string(),
                claimable: true,
            })
        }
        Ok(ClaimSimulation::Rejected(reason)) => {
            debug!("market {market} not claimable for {wallet:#x}: {reason}");
            None
        }
        Err(e) => {
            debug!("market {market} simulation failed for {wallet:#x}, treating as not claimable: {e}");
            None
        }
    }
}
