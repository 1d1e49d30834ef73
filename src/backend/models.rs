// Request and response bodies exchanged with the backend

use serde::{Deserialize, Serialize};

/// Envelope every backend call resolves to.
///
/// `ok` is false when the backend answered with a non-success status or an
/// explicit error; transport and decoding failures are `BackendError`s instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Data of a successful response
    pub fn into_data(self) -> Option<T> {
        if self.ok {
            self.data
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub id: String,
    pub name: String,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultTicker {
    pub guild_id: String,
    pub query: String,
    pub default_ticker: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DefaultTickerRequest {
    pub guild_id: String,
    pub query: String,
    pub default_ticker: String,
}

/// Price ratio of two tokens over time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    #[serde(default)]
    pub times: Vec<String>,
    #[serde(default)]
    pub ratios: Vec<f64>,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub coin_gecko_id: String,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftWatchlistItem {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub collection_address: String,
    #[serde(default)]
    pub floor_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddWatchlistRequest {
    pub user_id: String,
    pub symbol: String,
    pub coin_gecko_id: String,
}

/// Off-chain transfer submitted when an airdrop settles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub sender: String,
    pub recipients: Vec<String>,
    pub guild_id: String,
    pub channel_id: String,
    pub amount: f64,
    pub token: String,
    pub each: bool,
    pub all: bool,
    pub transfer_type: String,
    pub full_command: String,
    pub duration: u64,
}
