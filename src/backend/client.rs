use crate::backend::models::{
    AddWatchlistRequest, ApiResponse, Coin, Comparison, DefaultTicker, DefaultTickerRequest,
    NftWatchlistItem, TransferRequest, WatchlistItem,
};
use crate::backend::TransferGateway;
use crate::config::Config;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    error: Option<String>,
}

/// Client for the bot's REST backend
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl BackendClient {
    pub fn new(config: &Config) -> Result<Self, BackendError> {
        let timeout = Duration::from_secs(config.backend_timeout_secs);
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        let limiter = config
            .backend_rate_limit
            .and_then(NonZeroU32::new)
            .map(|per_second| Arc::new(RateLimiter::direct(Quota::per_second(per_second))));

        info!(
            "Initializing backend client with endpoint: {}, rate limit: {:?}",
            config.api_server_host, config.backend_rate_limit
        );

        Ok(Self::with_http(http, &config.api_server_host, limiter))
    }

    /// Build a client around an existing HTTP client, mainly for tests
    pub fn with_http(
        http: reqwest::Client,
        api_server_host: &str,
        limiter: Option<Arc<DefaultDirectRateLimiter>>,
    ) -> Self {
        Self {
            http,
            base_url: format!("{}/api/v1", api_server_host.trim_end_matches('/')),
            limiter,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<ApiResponse<T>, BackendError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let response = request.send().await?;
        let status = response.status();
        let url = response.url().to_string();
        let body = response.bytes().await?;

        if !status.is_success() {
            // Error bodies are not always JSON
            let error = serde_json::from_slice::<Envelope<Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.error)
                .unwrap_or_else(|| status.to_string());
            warn!("Backend call {} failed with {}: {}", url, status, error);
            return Ok(ApiResponse::failure(error));
        }

        let envelope: Envelope<T> = if body.is_empty() {
            Envelope {
                data: None,
                error: None,
            }
        } else {
            serde_json::from_slice(&body)?
        };

        match envelope.error {
            Some(error) => {
                warn!("Backend call {} returned error: {}", url, error);
                Ok(ApiResponse::failure(error))
            }
            None => {
                debug!("Backend call {} succeeded", url);
                Ok(ApiResponse {
                    ok: true,
                    data: envelope.data,
                    error: None,
                })
            }
        }
    }

    /// Search coins matching a symbol or name
    pub async fn search_coins(&self, query: &str) -> Result<ApiResponse<Vec<Coin>>, BackendError> {
        let request = self
            .http
            .get(self.url("/defi/coins"))
            .query(&[("query", query)]);
        self.send(request).await
    }

    /// Get a guild's default coin for a symbol
    pub async fn get_guild_default_ticker(
        &self,
        guild_id: &str,
        query: &str,
    ) -> Result<ApiResponse<DefaultTicker>, BackendError> {
        let request = self
            .http
            .get(self.url("/configs/default-ticker"))
            .query(&[("guild_id", guild_id), ("query", query)]);
        self.send(request).await
    }

    pub async fn set_guild_default_ticker(
        &self,
        body: &DefaultTickerRequest,
    ) -> Result<ApiResponse<Value>, BackendError> {
        let request = self.http.post(self.url("/configs/default-ticker")).json(body);
        self.send(request).await
    }

    /// Compare the price of two tokens over `days`
    pub async fn compare_token(
        &self,
        guild_id: &str,
        base: &str,
        target: &str,
        days: u32,
    ) -> Result<ApiResponse<Comparison>, BackendError> {
        let days = days.to_string();
        let request = self.http.get(self.url("/defi/coins/compare")).query(&[
            ("base", base),
            ("target", target),
            ("guild_id", guild_id),
            ("interval", days.as_str()),
        ]);
        self.send(request).await
    }

    pub async fn get_watchlist(
        &self,
        user_id: &str,
    ) -> Result<ApiResponse<Vec<WatchlistItem>>, BackendError> {
        let request = self
            .http
            .get(self.url("/defi/watchlist"))
            .query(&[("user_id", user_id)]);
        self.send(request).await
    }

    pub async fn add_to_watchlist(
        &self,
        body: &AddWatchlistRequest,
    ) -> Result<ApiResponse<Value>, BackendError> {
        let request = self.http.post(self.url("/defi/watchlist")).json(body);
        self.send(request).await
    }

    pub async fn remove_from_watchlist(
        &self,
        user_id: &str,
        symbol: &str,
    ) -> Result<ApiResponse<Value>, BackendError> {
        let request = self
            .http
            .delete(self.url("/defi/watchlist"))
            .query(&[("user_id", user_id), ("symbol", symbol)]);
        self.send(request).await
    }

    pub async fn get_nft_watchlist(
        &self,
        user_id: &str,
    ) -> Result<ApiResponse<Vec<NftWatchlistItem>>, BackendError> {
        let request = self
            .http
            .get(self.url("/nfts/watchlist"))
            .query(&[("user_id", user_id)]);
        self.send(request).await
    }

    pub async fn remove_nft_from_watchlist(
        &self,
        user_id: &str,
        symbol: &str,
    ) -> Result<ApiResponse<Value>, BackendError> {
        let request = self
            .http
            .delete(self.url("/nfts/watchlist"))
            .query(&[("user_id", user_id), ("symbol", symbol)]);
        self.send(request).await
    }
}

#[async_trait]
impl TransferGateway for BackendClient {
    async fn submit_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<ApiResponse<Value>, BackendError> {
        info!(
            "Submitting {} transfer of {} {} from {} to {} recipients",
            request.transfer_type,
            request.amount,
            request.token,
            request.sender,
            request.recipients.len()
        );
        let builder = self
            .http
            .post(self.url("/offchain-tip-bot/transfer"))
            .json(request);
        self.send(builder).await
    }
}
