use std::path::Path;
use std::sync::Arc;

use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use bike_server::cache::ResponseCache;
use bike_server::config::{AppConfig, ConfigError};
use bike_server::feed::{
    FeedClient, FeedClientConfig, FeedError, FeedSource, MockFeed, PayloadCache, StationFeed,
};
use bike_server::web::{AppState, RouteTable, RouteTableError, create_router};

/// Route table read from the working directory when `ROUTES_FILE` is unset.
const DEFAULT_ROUTES_FILE: &str = "routes.json";

/// Anything that stops the server from coming up.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Routes(#[from] RouteTableError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;
    let addr = config.server.socket_addr()?;

    let routes = load_routes(&config)?;
    info!(routes = routes.len(), "loaded route table");

    let source: Arc<dyn FeedSource> = match &config.feed_mock_file {
        Some(path) => {
            info!(path = %path.display(), "serving station feed from fixture");
            Arc::new(MockFeed::from_file(path)?)
        }
        None => {
            let client = FeedClient::new(FeedClientConfig::new(&config.feed_url))?;
            info!(url = %client.url(), "serving station feed from upstream");
            Arc::new(client)
        }
    };
    let feed = StationFeed::new(source, PayloadCache::new(&config.payload_cache));

    let state = AppState::new(
        config.app.clone(),
        feed,
        ResponseCache::new(config.response_cache.clone()),
        routes,
    );

    let app = create_router(state.clone())?
        .layer(RequestBodyTimeoutLayer::new(config.server.read_timeout))
        .layer(TimeoutLayer::new(config.server.write_timeout));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    info!(
        app = %config.app.display_name(),
        %addr,
        read_timeout_secs = config.server.read_timeout.as_secs(),
        write_timeout_secs = config.server.write_timeout.as_secs(),
        feed_ttl_secs = state.feed.cache().ttl().as_secs(),
        response_ttl_secs = config.response_cache.ttl.as_secs(),
        response_capacity = state.response_cache.capacity(),
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;

    info!("shutting down, clearing caches");
    state.response_cache.clear();
    state.feed.cache().clear().await;

    Ok(())
}

fn load_routes(config: &AppConfig) -> Result<RouteTable, RouteTableError> {
    match &config.routes_file {
        Some(path) => RouteTable::load(path),
        None if Path::new(DEFAULT_ROUTES_FILE).exists() => RouteTable::load(DEFAULT_ROUTES_FILE),
        None => {
            info!("no route table file, using built-in routes");
            Ok(RouteTable::default())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
