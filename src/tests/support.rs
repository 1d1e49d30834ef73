//! tests/support.rs - Test doubles shared by the test modules

use crate::{
    backend::{
        models::{Coin, NftWatchlistItem, WatchlistItem},
        ApiResponse, BackendClient, BackendError, TransferGateway, TransferRequest,
    },
    cache::settlement::{Settlement, SettlementError, SettlementHandler},
    chat::{ChatSurface, MessageEdit, SurfaceError},
    config::Config,
    state::AppState,
};
use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

/// Settlement handler remembering everything it was asked to settle
pub struct RecordingHandler<V> {
    settled: Mutex<Vec<Settlement<V>>>,
    started: AtomicUsize,
    delay: Option<Duration>,
    fail: bool,
}

impl<V> RecordingHandler<V> {
    fn build(delay: Option<Duration>, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            settled: Mutex::new(Vec::new()),
            started: AtomicUsize::new(0),
            delay,
            fail,
        })
    }

    pub fn new() -> Arc<Self> {
        Self::build(None, false)
    }

    /// Records the settlement, then reports an error
    pub fn failing() -> Arc<Self> {
        Self::build(None, true)
    }

    /// Waits `delay` before recording, like a slow payout
    pub fn slow(delay: Duration) -> Arc<Self> {
        Self::build(Some(delay), false)
    }

    pub fn settled(&self) -> Vec<Settlement<V>>
    where
        V: Clone,
    {
        self.settled.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.settled.lock().unwrap().len()
    }

    /// Settlements that began, finished or not
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<V: Send + Sync + 'static> SettlementHandler<V> for RecordingHandler<V> {
    async fn settle(&self, settlement: Settlement<V>) -> Result<(), SettlementError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.settled.lock().unwrap().push(settlement);
        if self.fail {
            return Err(SettlementError::Other("handler failure".to_string()));
        }
        Ok(())
    }
}

/// Let settlements handed to spawned tasks run to completion
pub async fn settle_pending() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Transfer gateway accepting (or rejecting) every transfer
#[derive(Default)]
pub struct MockGateway {
    pub requests: Mutex<Vec<TransferRequest>>,
    pub reject: bool,
}

impl MockGateway {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<TransferRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransferGateway for MockGateway {
    async fn submit_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<ApiResponse<Value>, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.reject {
            return Ok(ApiResponse::failure("insufficient balance"));
        }
        Ok(ApiResponse::success(json!({})))
    }
}

/// Chat surface recording edits and deletions
#[derive(Default)]
pub struct MockSurface {
    pub edits: Mutex<Vec<(String, String, MessageEdit)>>,
    pub deletes: Mutex<Vec<(String, String)>>,
    pub fail_edits: bool,
}

impl MockSurface {
    pub fn edits(&self) -> Vec<(String, String, MessageEdit)> {
        self.edits.lock().unwrap().clone()
    }

    pub fn last_edit(&self) -> Option<MessageEdit> {
        self.edits.lock().unwrap().last().map(|(_, _, edit)| edit.clone())
    }

    pub fn deletes(&self) -> Vec<(String, String)> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatSurface for MockSurface {
    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        edit: &MessageEdit,
    ) -> Result<(), SurfaceError> {
        if self.fail_edits {
            return Err(SurfaceError::Rejected {
                status: 404,
                message: "Unknown Message".to_string(),
            });
        }
        self.edits.lock().unwrap().push((
            channel_id.to_string(),
            message_id.to_string(),
            edit.clone(),
        ));
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), SurfaceError> {
        self.deletes
            .lock()
            .unwrap()
            .push((channel_id.to_string(), message_id.to_string()));
        Ok(())
    }
}

pub fn coin(id: &str, symbol: &str) -> Coin {
    Coin {
        id: id.to_string(),
        name: id.to_string(),
        symbol: symbol.to_string(),
    }
}

/// Data served by the stub backend
#[derive(Default)]
pub struct StubData {
    pub coins: HashMap<String, Vec<Coin>>,
    /// (guild, query) -> coin id
    pub defaults: HashMap<(String, String), String>,
    pub watchlist: Vec<WatchlistItem>,
    pub nft_watchlist: Vec<NftWatchlistItem>,
    pub calls: HashMap<&'static str, usize>,
    pub fail_writes: bool,
}

impl StubData {
    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls.get(endpoint).copied().unwrap_or(0)
    }
}

pub type SharedStub = Arc<Mutex<StubData>>;

fn bump<'a>(stub: &'a SharedStub, endpoint: &'static str) -> MutexGuard<'a, StubData> {
    let mut data = stub.lock().unwrap();
    *data.calls.entry(endpoint).or_insert(0) += 1;
    data
}

fn param(params: &HashMap<String, String>, name: &str) -> String {
    params.get(name).cloned().unwrap_or_default()
}

fn write_result(data: &StubData) -> (StatusCode, Json<Value>) {
    if data.fail_writes {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "write failed" })),
        )
    } else {
        (StatusCode::OK, Json(json!({ "data": {} })))
    }
}

async fn search(
    State(stub): State<SharedStub>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let data = bump(&stub, "search");
    let coins = data
        .coins
        .get(&param(&params, "query"))
        .cloned()
        .unwrap_or_default();
    Json(json!({ "data": coins }))
}

async fn get_default(
    State(stub): State<SharedStub>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let data = bump(&stub, "get_default");
    let guild_id = param(&params, "guild_id");
    let query = param(&params, "query");
    match data.defaults.get(&(guild_id.clone(), query.clone())) {
        Some(coin_id) => (
            StatusCode::OK,
            Json(json!({ "data": {
                "guild_id": guild_id,
                "query": query,
                "default_ticker": coin_id,
            }})),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "default ticker not found" })),
        ),
    }
}

async fn set_default(State(stub): State<SharedStub>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut data = bump(&stub, "set_default");
    if !data.fail_writes {
        let key = (
            body["guild_id"].as_str().unwrap_or_default().to_string(),
            body["query"].as_str().unwrap_or_default().to_string(),
        );
        let coin_id = body["default_ticker"].as_str().unwrap_or_default().to_string();
        data.defaults.insert(key, coin_id);
    }
    write_result(&data)
}

async fn compare(
    State(stub): State<SharedStub>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let _data = bump(&stub, "compare");
    Json(json!({ "data": {
        "times": ["2022-06-01", "2022-06-02"],
        "ratios": [0.5, 0.6],
        "from": param(&params, "base"),
        "to": param(&params, "target"),
    }}))
}

async fn watchlist(State(stub): State<SharedStub>) -> Json<Value> {
    let data = bump(&stub, "watchlist");
    Json(json!({ "data": data.watchlist }))
}

async fn add_watchlist(State(stub): State<SharedStub>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut data = bump(&stub, "add_watchlist");
    if !data.fail_writes {
        data.watchlist.push(WatchlistItem {
            symbol: body["symbol"].as_str().unwrap_or_default().to_string(),
            name: String::new(),
            coin_gecko_id: body["coin_gecko_id"].as_str().unwrap_or_default().to_string(),
            current_price: None,
            price_change_percentage_24h: None,
        });
    }
    write_result(&data)
}

async fn remove_watchlist(
    State(stub): State<SharedStub>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let mut data = bump(&stub, "remove_watchlist");
    let symbol = param(&params, "symbol");
    data.watchlist.retain(|item| item.symbol != symbol);
    write_result(&data)
}

async fn nft_watchlist(State(stub): State<SharedStub>) -> Json<Value> {
    let data = bump(&stub, "nft_watchlist");
    Json(json!({ "data": data.nft_watchlist }))
}

async fn remove_nft_watchlist(
    State(stub): State<SharedStub>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let mut data = bump(&stub, "remove_nft_watchlist");
    let symbol = param(&params, "symbol");
    data.nft_watchlist.retain(|item| item.symbol != symbol);
    write_result(&data)
}

async fn transfer(State(stub): State<SharedStub>, Json(_body): Json<Value>) -> (StatusCode, Json<Value>) {
    let data = bump(&stub, "transfer");
    write_result(&data)
}

/// Serve `data` on an ephemeral port, returning the host and the shared data
pub async fn spawn_backend(data: StubData) -> (String, SharedStub) {
    let stub: SharedStub = Arc::new(Mutex::new(data));
    let app = Router::new()
        .route("/api/v1/defi/coins", get(search))
        .route("/api/v1/configs/default-ticker", get(get_default).post(set_default))
        .route("/api/v1/defi/coins/compare", get(compare))
        .route(
            "/api/v1/defi/watchlist",
            get(watchlist).post(add_watchlist).delete(remove_watchlist),
        )
        .route(
            "/api/v1/nfts/watchlist",
            get(nft_watchlist).delete(remove_nft_watchlist),
        )
        .route("/api/v1/offchain-tip-bot/transfer", post(transfer))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), stub)
}

/// Everything a flow test needs, wired the way `main` wires it
pub struct Harness {
    pub state: Arc<AppState>,
    pub gateway: Arc<MockGateway>,
    pub surface: Arc<MockSurface>,
}

pub fn harness(api_server_host: &str) -> Harness {
    let config = Config {
        api_server_host: api_server_host.to_string(),
        ..Config::default()
    };
    let backend = BackendClient::with_http(reqwest::Client::new(), api_server_host, None);
    let gateway = Arc::new(MockGateway::default());
    let surface = Arc::new(MockSurface::default());
    let state = Arc::new(AppState::new(
        config,
        backend,
        gateway.clone(),
        surface.clone(),
    ));

    Harness {
        state,
        gateway,
        surface,
    }
}
