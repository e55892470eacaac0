use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tour_server::api::{ApiConfig, ApiError, MockDataError, MockTourApi, TourApi, TourApiClient};
use tour_server::cache::{CacheConfig, CachedTourApi};
use tour_server::clock::{Clock, SystemClock};
use tour_server::search::SearchConfig;
use tour_server::web::{AppState, ServeError, serve};

/// How often to drop cached catalog data and suggestions (24 hours).
const CATALOG_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_MOCK_DATA: &str = "data/mock_catalog.json";

#[derive(Debug, Error)]
enum StartupError {
    #[error("invalid TOUR_BIND_ADDR: {0}")]
    BindAddr(#[from] AddrParseError),

    #[error("failed to create API client: {0}")]
    Client(#[from] ApiError),

    #[error(transparent)]
    MockData(#[from] MockDataError),

    #[error(transparent)]
    Serve(#[from] ServeError),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tour_server=info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "tour server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let addr: SocketAddr = std::env::var("TOUR_BIND_ADDR")
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
        .parse()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match std::env::var("TOUR_API_URL") {
        Ok(base_url) => {
            let mut config = ApiConfig::new(&base_url);
            match std::env::var("TOUR_API_KEY") {
                Ok(key) => config = config.with_api_key(key),
                Err(_) => warn!("TOUR_API_KEY not set. Requests will be unauthenticated."),
            }
            info!(%base_url, "using tour API");
            start(TourApiClient::new(config)?, clock, addr).await
        }
        Err(_) => {
            let path =
                std::env::var("TOUR_MOCK_DATA").unwrap_or_else(|_| DEFAULT_MOCK_DATA.to_string());
            let mock = MockTourApi::from_file(&path, clock.clone())?;
            info!(%path, "TOUR_API_URL not set, using mock backend");
            start(mock, clock, addr).await
        }
    }
}

async fn start<A: TourApi>(
    api: A,
    clock: Arc<dyn Clock>,
    addr: SocketAddr,
) -> Result<(), StartupError> {
    let cached = CachedTourApi::new(api, &CacheConfig::default());
    let state = AppState::new(cached, clock, SearchConfig::default());

    // Drop catalog data daily so hotel changes eventually show up
    let refresh = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CATALOG_REFRESH_INTERVAL);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            refresh.api.invalidate_cache();
            refresh.geo.clear().await;
            info!("cleared catalog caches");
        }
    });

    info!("endpoints: GET /health, GET /api/countries, GET /api/geo?q=, GET|POST|DELETE /api/search");
    serve(state, addr).await?;
    Ok(())
}
