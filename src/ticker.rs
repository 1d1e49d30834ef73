//! Ticker lookups: coin search, per-guild default coins and comparisons
//!
//! Reads go through the `ticker` lookup pool. Every write that changes a
//! guild default invalidates the cached reads it makes stale.

use crate::backend::models::{Coin, Comparison, DefaultTickerRequest};
use crate::backend::{ApiResponse, BackendClient, BackendError};
use crate::cache::keys::{compare_prefix, LookupKey, TICKER_POOL};
use crate::cache::lookup::{LookupCache, LookupError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum TickerError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Backend rejected the request: {0}")]
    Rejected(String),
}

/// Outcome of resolving a user's query to a coin
#[derive(Debug, Clone, PartialEq)]
pub enum TickerResolution {
    Unsupported,
    Resolved(Coin),
    /// Several coins match and the guild has no default; the user must pick one
    Ambiguous(Vec<Coin>),
}

#[derive(Clone)]
pub struct TickerService {
    backend: BackendClient,
    cache: LookupCache,
}

fn rejected<T>(response: ApiResponse<T>) -> TickerError {
    TickerError::Rejected(
        response
            .error
            .unwrap_or_else(|| "unknown error".to_string()),
    )
}

impl TickerService {
    pub fn new(backend: BackendClient, cache: LookupCache) -> Self {
        Self { backend, cache }
    }

    pub async fn resolve(&self, guild_id: &str, query: &str) -> Result<TickerResolution, TickerError> {
        let backend = &self.backend;
        let search = self
            .cache
            .get_keyed(&LookupKey::ticker_search(query), || backend.search_coins(query))
            .await?;
        if !search.ok {
            return Err(rejected(search));
        }

        let coins = search.data.unwrap_or_default();
        match coins.len() {
            0 => return Ok(TickerResolution::Unsupported),
            1 => return Ok(TickerResolution::Resolved(coins[0].clone())),
            _ => {}
        }

        // A missing default comes back as `not ok` and is simply not applied
        let default = self
            .cache
            .get_keyed(&LookupKey::ticker_default(guild_id, query), || {
                backend.get_guild_default_ticker(guild_id, query)
            })
            .await?;

        if let Some(default) = default.into_data() {
            if let Some(coin) = coins.iter().find(|c| c.id == default.default_ticker) {
                debug!("Using default {} for {} in guild {}", coin.id, query, guild_id);
                return Ok(TickerResolution::Resolved(coin.clone()));
            }
        }

        Ok(TickerResolution::Ambiguous(coins))
    }

    /// Make `coin_id` the guild's answer for `query` from now on
    pub async fn set_default(&self, guild_id: &str, query: &str, coin_id: &str) -> Result<(), TickerError> {
        let response = self
            .backend
            .set_guild_default_ticker(&DefaultTickerRequest {
                guild_id: guild_id.to_string(),
                query: query.to_string(),
                default_ticker: coin_id.to_string(),
            })
            .await?;

        if !response.ok {
            return Err(rejected(response));
        }

        self.cache
            .remove_keyed(&LookupKey::ticker_default(guild_id, query))
            .await;
        info!("Default ticker for {} in guild {} is now {}", query, guild_id, coin_id);
        Ok(())
    }

    pub async fn compare(
        &self,
        guild_id: &str,
        base: &str,
        target: &str,
        days: u32,
    ) -> Result<Comparison, TickerError> {
        let backend = &self.backend;
        let response = self
            .cache
            .get_keyed(&LookupKey::compare(guild_id, base, target, days), || {
                backend.compare_token(guild_id, base, target, days)
            })
            .await?;

        if !response.ok {
            return Err(rejected(response));
        }
        response
            .data
            .ok_or_else(|| TickerError::Rejected("empty comparison".to_string()))
    }

    /// Store the defaults picked from a comparison's suggestions.
    ///
    /// Both symbols' defaults and every cached comparison between them, in
    /// either direction, are invalidated even if one of the writes failed.
    pub async fn set_compare_defaults(
        &self,
        guild_id: &str,
        base_symbol: &str,
        base_coin: &str,
        target_symbol: &str,
        target_coin: &str,
    ) -> Result<(), TickerError> {
        let base_request = DefaultTickerRequest {
            guild_id: guild_id.to_string(),
            query: base_symbol.to_string(),
            default_ticker: base_coin.to_string(),
        };
        let target_request = DefaultTickerRequest {
            guild_id: guild_id.to_string(),
            query: target_symbol.to_string(),
            default_ticker: target_coin.to_string(),
        };

        let (base, target) = futures::join!(
            self.backend.set_guild_default_ticker(&base_request),
            self.backend.set_guild_default_ticker(&target_request)
        );

        self.cache
            .remove_keyed(&LookupKey::ticker_default(guild_id, base_symbol))
            .await;
        self.cache
            .remove_keyed(&LookupKey::ticker_default(guild_id, target_symbol))
            .await;
        self.cache
            .find_and_remove_prefix(TICKER_POOL, &compare_prefix(guild_id, base_symbol, target_symbol));
        self.cache
            .find_and_remove_prefix(TICKER_POOL, &compare_prefix(guild_id, target_symbol, base_symbol));

        for response in [base?, target?] {
            if !response.ok {
                return Err(rejected(response));
            }
        }

        info!(
            "Compare defaults for {}/{} in guild {} are now {}/{}",
            base_symbol, target_symbol, guild_id, base_coin, target_coin
        );
        Ok(())
    }
}
