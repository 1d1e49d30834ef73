//! Token and NFT watchlists, cached per user in the `watchlist` pool

use crate::backend::models::{AddWatchlistRequest, NftWatchlistItem, WatchlistItem};
use crate::backend::{ApiResponse, BackendClient, BackendError};
use crate::cache::keys::LookupKey;
use crate::cache::lookup::{LookupCache, LookupError};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum WatchlistError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Watchlist request rejected: {0}")]
    Rejected(String),
}

#[derive(Clone)]
pub struct WatchlistService {
    backend: BackendClient,
    cache: LookupCache,
}

fn ensure_ok<T>(response: ApiResponse<T>) -> Result<Option<T>, WatchlistError> {
    if response.ok {
        Ok(response.data)
    } else {
        Err(WatchlistError::Rejected(
            response
                .error
                .unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

impl WatchlistService {
    pub fn new(backend: BackendClient, cache: LookupCache) -> Self {
        Self { backend, cache }
    }

    pub async fn view(&self, user_id: &str) -> Result<Vec<WatchlistItem>, WatchlistError> {
        let backend = &self.backend;
        let response = self
            .cache
            .get_keyed(&LookupKey::watchlist(user_id), || backend.get_watchlist(user_id))
            .await?;
        Ok(ensure_ok(response)?.unwrap_or_default())
    }

    pub async fn view_nft(&self, user_id: &str) -> Result<Vec<NftWatchlistItem>, WatchlistError> {
        let backend = &self.backend;
        let response = self
            .cache
            .get_keyed(&LookupKey::watchlist_nft(user_id), || {
                backend.get_nft_watchlist(user_id)
            })
            .await?;
        Ok(ensure_ok(response)?.unwrap_or_default())
    }

    pub async fn add(&self, user_id: &str, symbol: &str, coin_gecko_id: &str) -> Result<Option<Value>, WatchlistError> {
        let response = self
            .backend
            .add_to_watchlist(&AddWatchlistRequest {
                user_id: user_id.to_string(),
                symbol: symbol.to_string(),
                coin_gecko_id: coin_gecko_id.to_string(),
            })
            .await?;
        let data = ensure_ok(response)?;

        self.cache.remove_keyed(&LookupKey::watchlist(user_id)).await;
        info!("Added {} to watchlist of {}", symbol, user_id);
        Ok(data)
    }

    pub async fn remove(&self, user_id: &str, symbol: &str) -> Result<(), WatchlistError> {
        let response = self.backend.remove_from_watchlist(user_id, symbol).await?;
        ensure_ok(response)?;

        self.cache.remove_keyed(&LookupKey::watchlist(user_id)).await;
        info!("Removed {} from watchlist of {}", symbol, user_id);
        Ok(())
    }

    pub async fn remove_nft(&self, user_id: &str, symbol: &str) -> Result<(), WatchlistError> {
        let response = self.backend.remove_nft_from_watchlist(user_id, symbol).await?;
        ensure_ok(response)?;

        self.cache.remove_keyed(&LookupKey::watchlist_nft(user_id)).await;
        info!("Removed NFT {} from watchlist of {}", symbol, user_id);
        Ok(())
    }
}
