//! Wallet identity enrichment against an external lookup service.
//!
//! Identities are cosmetic: the numeric leaderboard never waits on this
//! service, and any wallet the service does not know (or any lookup that
//! keeps failing) degrades to a truncated-address display string. Hits are
//! cached for a long TTL in a map separate from the short-TTL leaderboard
//! cache — identities change rarely, winnings change constantly.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::config::{IDENTITY_CHUNK_SIZE, IDENTITY_TTL_SECS};
use crate::error::{AppError, Result};
use crate::retry::{with_retries, RetryPolicy};
use crate::types::Identity;

/// One record in the lookup service's response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityRecord {
    address: String,
    display_name: String,
    numeric_id: Option<u64>,
    avatar_url: Option<String>,
}

pub struct IdentityEnricher {
    client: reqwest::Client,
    /// None means no service configured: every wallet gets the fallback.
    base_url: Option<String>,
    cache: ResultCache<Identity>,
    ttl: Duration,
    retry: RetryPolicy,
}

impl IdentityEnricher {
    pub fn new(base_url: Option<String>, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            cache: ResultCache::new(),
            ttl: Duration::from_secs(IDENTITY_TTL_SECS),
            retry,
        }
    }

    /// Resolve identities for a set of lowercase 0x-prefixed wallet keys.
    /// Infallible: service misses and exhausted lookups both fall back to a
    /// truncated-address identity. Fallbacks are not cached, so a wallet that
    /// registers later is picked up on the next refresh.
    pub async fn enrich(&self, wallets: &[String]) -> HashMap<String, Identity> {
        let mut resolved: HashMap<String, Identity> = HashMap::new();
        let mut misses: Vec<String> = Vec::new();

        for wallet in wallets {
            match self.cache.get_fresh(wallet) {
                Some(identity) => {
                    resolved.insert(wallet.clone(), identity);
                }
                None => misses.push(wallet.clone()),
            }
        }

        if let Some(base) = &self.base_url {
            for chunk in misses.chunks(IDENTITY_CHUNK_SIZE) {
                match with_retries("identity_lookup", &self.retry, || {
                    self.lookup_chunk(base, chunk)
                })
                .await
                {
                    Ok(found) => {
                        for (wallet, identity) in found {
                            self.cache.set(&wallet, identity.clone(), self.ttl);
                            resolved.insert(wallet, identity);
                        }
                    }
                    Err(e) => {
                        warn!(chunk = chunk.len(), "identity lookup failed, degrading: {e}");
                    }
                }
            }
        } else {
            debug!("no identity service configured");
        }

        for wallet in wallets {
            if !resolved.contains_key(wallet) {
                resolved.insert(wallet.clone(), fallback_identity(wallet));
            }
        }
        resolved
    }

    async fn lookup_chunk(
        &self,
        base: &str,
        addresses: &[String],
    ) -> Result<HashMap<String, Identity>> {
        let response = self
            .client
            .post(format!("{base}/identities"))
            .json(&json!({ "addresses": addresses }))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::RateLimited("identity service".to_string()));
        }
        let records: Vec<IdentityRecord> = response.error_for_status()?.json().await?;
        Ok(records_to_map(records))
    }
}

/// Key the response by lowercase address so lookups match the canonical
/// wallet rendering regardless of the service's casing.
fn records_to_map(records: Vec<IdentityRecord>) -> HashMap<String, Identity> {
    records
        .into_iter()
        .map(|r| {
            (
                r.address.to_lowercase(),
                Identity {
                    display_name: r.display_name,
                    numeric_id: r.numeric_id,
                    avatar_url: r.avatar_url,
                },
            )
        })
        .collect()
}

/// `0x1234…abcd` style placeholder for wallets without a known identity.
pub fn fallback_identity(wallet: &str) -> Identity {
    let display_name = if wallet.len() > 12 {
        format!("{}…{}", &wallet[..6], &wallet[wallet.len() - 4..])
    } else {
        wallet.to_string()
    };
    Identity {
        display_name,
        numeric_id: None,
        avatar_url: None,
    }
}
