use std::sync::Arc;

use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feedreader::config::Config;
use feedreader::fetcher::HttpFetcher;
use feedreader::loader::FeedLoader;
use feedreader::render::RenderContainer;
use feedreader::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feedreader=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; a bad registry is fatal
    let config_path =
        std::env::var("FEEDREADER_CONFIG").unwrap_or_else(|_| "feeds.toml".to_string());
    let config = Config::load(&config_path)?;
    let registry = Arc::new(config.registry()?);
    info!("Loaded {} feeds from {}", registry.len(), config_path);

    let fetcher = Arc::new(HttpFetcher::new(config.request_timeout())?);
    let loader = FeedLoader::new(registry, fetcher, RenderContainer::shared());

    // Initial load of the first feed
    let initial = loader.load_feed(0)?;
    tokio::spawn(async move {
        let outcome = initial.wait().await;
        if outcome.is_loaded() {
            info!("Initial feed ready: {:?}", outcome);
        } else {
            warn!("Initial feed failed: {:?}", outcome);
        }
    });

    let state = Arc::new(AppState::new(loader));

    // Build router
    let app = routes::router(state)
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_address.as_str()).await?;
    info!("Server starting on http://{}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
