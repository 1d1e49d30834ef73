use tipbot_core::{
    api,
    backend::BackendClient,
    chat::DiscordSurface,
    config::Config,
    state::AppState,
};

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tipbot-core");

    // Load configuration
    let config = Config::from_env();
    info!(
        "Configuration loaded: backend {}, lookup TTL {:?}, selection TTL {:?}",
        config.api_server_host, config.lookup_cache_ttl, config.selection_ttl
    );

    // Collaborators
    let backend = BackendClient::new(&config)?;
    let surface = Arc::new(DiscordSurface::new(&config)?);

    // Create shared state
    let app_state = Arc::new(AppState::new(
        config.clone(),
        backend.clone(),
        Arc::new(backend),
        surface,
    ));

    // Start HTTP server
    let app = api::create_router(app_state.clone());
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Health server listening on {}", addr);

    let shutdown = CancellationToken::new();
    let server_token = shutdown.clone();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_token.cancelled().await })
            .await;
        if let Err(e) = result {
            error!("Server error: {}", e);
        }
    });

    app_state.set_ready(true);
    info!("Ready");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    app_state.set_ready(false);
    shutdown.cancel();
    server.await?;

    let pending = app_state.airdrops.entries().len();
    if pending > 0 {
        info!("{} airdrops still open at shutdown are dropped", pending);
    }
    Ok(())
}
