use crate::{
    api::{error::ApiError, response::ApiResponse},
    cache::lookup::PoolStats,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

#[derive(Serialize)]
pub struct CacheStats {
    pub interaction_entries: usize,
    pub pools: Vec<PoolStats>,
}

// Create router with all routes
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/stats", get(stats))
        .route("/stats/{pool}", get(pool_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

// GET /healthz handler
async fn healthz(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    if !state.is_ready() {
        return Err(ApiError::NotReady);
    }
    Ok((StatusCode::OK, "OK").into_response())
}

// GET /stats handler
async fn stats(State(state): State<Arc<AppState>>) -> ApiResponse<CacheStats> {
    let data = CacheStats {
        interaction_entries: state.airdrops.entries().len(),
        pools: state.lookup.stats().await,
    };
    debug!(
        "Stats: {} interaction entries, {} lookup pools",
        data.interaction_entries,
        data.pools.len()
    );
    ApiResponse { data }
}

// GET /stats/{pool} handler
async fn pool_stats(
    State(state): State<Arc<AppState>>,
    Path(pool): Path<String>,
) -> Result<ApiResponse<PoolStats>, ApiError> {
    state
        .lookup
        .stats()
        .await
        .into_iter()
        .find(|stats| stats.name == pool)
        .map(|data| ApiResponse { data })
        .ok_or(ApiError::NotFound(format!("lookup pool {}", pool)))
}
