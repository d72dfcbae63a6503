//! Leaderboard aggregation across the two contract generations.
//!
//! Generation 1 exposes a native paginated leaderboard; generation 2 has
//! none, so the participants index is enumerated positionally and each
//! discovered wallet's portfolio is read back. The merged table is rebuilt
//! wholesale on every refresh — no incremental update.

use std::collections::{HashMap, HashSet};

use alloy::primitives::{Address, U256};
use futures_util::future::join_all;
use tracing::{debug, info};

use crate::config::ScanCaps;
use crate::error::Result;
use crate::ledger::LedgerReader;
use crate::retry::{with_retries, RetryPolicy};
use crate::types::{address_string, to_display_amount, Generation, LeaderboardEntry};

/// Per-wallet totals during the merge. The combine is associative per field:
/// cumulative counters sum, a wallet absent from one source contributes zero
/// from it.
#[derive(Debug, Default, Clone, Copy)]
struct MergedTotals {
    winnings: U256,
    trades: u64,
}

impl MergedTotals {
    fn absorb(&mut self, winnings: U256, trades: u64) {
        self.winnings += winnings;
        self.trades += trades;
    }
}

/// Build the merged, ranked, truncated leaderboard. Identities are attached
/// by the caller afterwards — the numeric table never waits on the identity
/// service.
pub async fn aggregate(
    ledger: &dyn LedgerReader,
    retry: &RetryPolicy,
    caps: &ScanCaps,
) -> Result<Vec<LeaderboardEntry>> {
    let mut totals: HashMap<Address, MergedTotals> = HashMap::new();

    // --- Generation 1: native paginated leaderboard ---
    let mut offset = 0u64;
    loop {
        let page = with_retries("leaderboard_page", retry, || {
            ledger.leaderboard_page(offset, caps.leaderboard_page_size)
        })
        .await?;
        let page_len = page.len() as u64;
        for row in page {
            totals
                .entry(row.wallet)
                .or_default()
                .absorb(row.total_winnings, row.trade_count);
        }
        if page_len < caps.leaderboard_page_size {
            break;
        }
        offset += caps.leaderboard_page_size;
    }
    let v1_wallets = totals.len();
    debug!(generation = %Generation::V1, wallets = v1_wallets, "leaderboard source collected");

    // --- Generation 2: positional participant enumeration ---
    let participants = enumerate_participants(ledger, retry, caps).await;
    let v2_count = participants.len();

    for chunk in participants.chunks(caps.portfolio_batch_size) {
        let reads = chunk.iter().map(|&wallet| async move {
            (
                wallet,
                with_retries("portfolio", retry, || ledger.portfolio(wallet)).await,
            )
        });
        for (wallet, result) in join_all(reads).await {
            match result {
                Ok(p) if p.total_winnings > U256::ZERO => {
                    totals
                        .entry(wallet)
                        .or_default()
                        .absorb(p.total_winnings, p.trade_count);
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("skipping portfolio for {wallet:#x}: {e}");
                }
            }
        }
    }
    debug!(generation = %Generation::V2, wallets = v2_count, "leaderboard source collected");

    // Read once; no hardcoded fallback here — a failure fails the refresh and
    // the caller falls back to the stale cached table.
    let decimals = with_retries("token_decimals", retry, || ledger.token_decimals()).await?;

    let mut merged: Vec<(Address, MergedTotals)> = totals
        .into_iter()
        .filter(|(_, t)| t.winnings > U256::ZERO)
        .collect();
    // Sort on raw winnings (not the float rendering); tie-break on address so
    // repeated refreshes rank equal wallets identically.
    merged.sort_by(|a, b| b.1.winnings.cmp(&a.1.winnings).then(a.0.cmp(&b.0)));
    merged.truncate(caps.leaderboard_top_n);

    info!(
        entries = merged.len(),
        v1_wallets, v2_wallets = v2_count, "leaderboard aggregated",
    );

    Ok(merged
        .into_iter()
        .map(|(wallet, t)| LeaderboardEntry {
            wallet: address_string(&wallet),
            total_winnings: to_display_amount(t.winnings, decimals),
            trade_count: t.trades,
            identity: None,
        })
        .collect())
}

/// Walk the participants index in concurrent batches of fixed size. Every
/// read in a batch is collected before the termination check: any absent
/// entry in the fully collected batch ends enumeration. A read that still
/// fails after retries is treated as absent — inherited source policy, kept
/// deliberately (see the masquerade test below), since a transient fault here
/// can otherwise stall the whole refresh.
async fn enumerate_participants(
    ledger: &dyn LedgerReader,
    retry: &RetryPolicy,
    caps: &ScanCaps,
) -> Vec<Address> {
    let mut wallets: Vec<Address> = Vec::new();
    let mut seen: HashSet<Address> = HashSet::new();
    let mut next_index = 0u64;

    while next_index < caps.max_participants {
        let batch_end = (next_index + caps.participant_batch_size as u64).min(caps.max_participants);
        let reads = (next_index..batch_end).map(|index| async move {
            with_retries("participant_at", retry, || ledger.participant_at(index)).await
        });
        let results = join_all(reads).await;
        next_index = batch_end;

        let mut saw_absent = false;
        for result in results {
            match result {
                Ok(Some(wallet)) => {
                    if seen.insert(wallet) {
                        wallets.push(wallet);
                    }
                }
                Ok(None) => saw_absent = true,
                Err(e) => {
                    debug!("participant read exhausted retries, treating as absent: {e}");
                    saw_absent = true;
                }
            }
        }
        if saw_absent {
            break;
        }
    }

    wallets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::mock::{addr, MockLedger};
    use crate::types::{LeaderboardRow, Portfolio};
    use std::sync::atomic::Ordering;

    fn test_caps() -> ScanCaps {
        ScanCaps {
            leaderboard_page_size: 2,
            participant_batch_size: 3,
            max_participants: 30,
            portfolio_batch_size: 2,
            leaderboard_top_n: 10,
            ..ScanCaps::default()
        }
    }

    fn no_sleep_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        }
    }

    fn row(wallet: Address, winnings: u64, trades: u64) -> LeaderboardRow {
        LeaderboardRow {
            wallet,
            total_winnings: U256::from(winnings),
            trade_count: trades,
        }
    }

    fn display_ledger() -> MockLedger {
        // decimals = 0 so display amounts equal raw amounts in assertions.
        let mut ledger = MockLedger::new();
        ledger.decimals = 0;
        ledger
    }

    #[tokio::test]
    async fn wallet_in_both_generations_sums_winnings_and_trades() {
        let w = addr(0x55);
        let mut ledger = display_ledger();
        ledger.leaderboard_rows = vec![row(w, 100, 4)];
        ledger.participants = vec![Some(w)];
        ledger.portfolios.insert(
            w,
            Portfolio {
                total_winnings: U256::from(50u64),
                trade_count: 6,
            },
        );

        let entries = aggregate(&ledger, &no_sleep_retry(), &test_caps())
            .await
            .unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].wallet, address_string(&w));
        assert!((entries[0].total_winnings - 150.0).abs() < 1e-9);
        assert_eq!(entries[0].trade_count, 10);
    }

    #[tokio::test]
    async fn wallet_in_one_generation_is_no_error() {
        let only_v1 = addr(0x01);
        let only_v2 = addr(0x02);
        let mut ledger = display_ledger();
        ledger.leaderboard_rows = vec![row(only_v1, 30, 1)];
        ledger.participants = vec![Some(only_v2)];
        ledger.portfolios.insert(
            only_v2,
            Portfolio {
                total_winnings: U256::from(70u64),
                trade_count: 2,
            },
        );

        let entries = aggregate(&ledger, &no_sleep_retry(), &test_caps())
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].wallet, address_string(&only_v2));
        assert!((entries[0].total_winnings - 70.0).abs() < 1e-9);
        assert_eq!(entries[1].wallet, address_string(&only_v1));
        assert!((entries[1].total_winnings - 30.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn zero_winnings_wallets_are_filtered_out() {
        let winner = addr(0x01);
        let zero = addr(0x02);
        let mut ledger = display_ledger();
        ledger.leaderboard_rows = vec![row(winner, 10, 1), row(zero, 0, 5)];

        let entries = aggregate(&ledger, &no_sleep_retry(), &test_caps())
            .await
            .unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].wallet, address_string(&winner));
    }

    #[tokio::test]
    async fn sorted_descending_and_truncated_to_top_n() {
        let mut ledger = display_ledger();
        ledger.leaderboard_rows = vec![
            row(addr(0x01), 10, 1),
            row(addr(0x02), 30, 1),
            row(addr(0x03), 20, 1),
        ];
        let mut caps = test_caps();
        caps.leaderboard_top_n = 2;

        let entries = aggregate(&ledger, &no_sleep_retry(), &caps).await.unwrap();

        assert_eq!(entries.len(), 2);
        assert!((entries[0].total_winnings - 30.0).abs() < 1e-9);
        assert!((entries[1].total_winnings - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn pagination_stops_on_short_page() {
        let mut ledger = display_ledger();
        // 5 rows at page size 2: pages of 2, 2, 1 — the short page ends it.
        ledger.leaderboard_rows = (1u8..=5).map(|i| row(addr(i), u64::from(i), 1)).collect();

        let entries = aggregate(&ledger, &no_sleep_retry(), &test_caps())
            .await
            .unwrap();

        assert_eq!(entries.len(), 5);
        assert_eq!(ledger.calls.leaderboard_page_reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_page_read_is_retried() {
        let mut ledger = display_ledger();
        ledger.leaderboard_rows = vec![row(addr(0x01), 10, 1)];
        ledger.fail_leaderboard_pages.store(1, Ordering::SeqCst);

        let retry = RetryPolicy {
            max_attempts: 2,
            ..RetryPolicy::default()
        };
        let entries = aggregate(&ledger, &retry, &test_caps()).await.unwrap();

        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn absent_entry_mid_batch_ends_enumeration_after_collecting_the_batch() {
        // Index 1 is a hole but 0 and 2 are in the same batch (size 3) and
        // must still be collected; index 3 is beyond the terminating batch
        // and must never be read.
        let mut ledger = display_ledger();
        ledger.participants = vec![Some(addr(0x01)), None, Some(addr(0x02)), Some(addr(0x03))];
        for i in 1u8..=3 {
            ledger.portfolios.insert(
                addr(i),
                Portfolio {
                    total_winnings: U256::from(10u64 * u64::from(i)),
                    trade_count: 1,
                },
            );
        }

        let entries = aggregate(&ledger, &no_sleep_retry(), &test_caps())
            .await
            .unwrap();

        let wallets: Vec<&str> = entries.iter().map(|e| e.wallet.as_str()).collect();
        assert!(wallets.contains(&address_string(&addr(0x01)).as_str()));
        assert!(wallets.contains(&address_string(&addr(0x02)).as_str()));
        assert!(!wallets.contains(&address_string(&addr(0x03)).as_str()));
        assert_eq!(ledger.calls.participant_reads.load(Ordering::SeqCst), 3);
    }

    /// Documents the inherited source policy: a participant read that fails
    /// even after retries is indistinguishable from an absent entry and ends
    /// enumeration. A transient fault can therefore truncate the generation-2
    /// contribution for one refresh cycle; the next refresh self-heals.
    #[tokio::test]
    async fn exhausted_read_fault_masquerades_as_absent() {
        let mut ledger = display_ledger();
        ledger.participants = vec![Some(addr(0x01)), Some(addr(0x02)), Some(addr(0x03)), Some(addr(0x04))];
        ledger.fail_participant_at.insert(1);
        for i in 1u8..=4 {
            ledger.portfolios.insert(
                addr(i),
                Portfolio {
                    total_winnings: U256::from(10u64),
                    trade_count: 1,
                },
            );
        }

        let entries = aggregate(&ledger, &no_sleep_retry(), &test_caps())
            .await
            .unwrap();

        let wallets: Vec<&str> = entries.iter().map(|e| e.wallet.as_str()).collect();
        // Batch-mates of the faulted index are still collected.
        assert!(wallets.contains(&address_string(&addr(0x01)).as_str()));
        assert!(wallets.contains(&address_string(&addr(0x03)).as_str()));
        // Index 3 sits in the next batch and is never reached.
        assert!(!wallets.contains(&address_string(&addr(0x04)).as_str()));
    }

    #[tokio::test]
    async fn decimals_read_failure_fails_the_refresh() {
        let mut ledger = display_ledger();
        ledger.leaderboard_rows = vec![row(addr(0x01), 10, 1)];
        ledger.fail_decimals.store(true, Ordering::SeqCst);

        let result = aggregate(&ledger, &no_sleep_retry(), &test_caps()).await;
        assert!(result.is_err());
    }

    #[test]
    fn merge_combine_is_per_field_sum() {
        let mut t = MergedTotals::default();
        t.absorb(U256::from(100u64), 4);
        t.absorb(U256::from(50u64), 6);
        assert_eq!(t.winnings, U256::from(150u64));
        assert_eq!(t.trades, 10);
    }
}
