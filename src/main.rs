use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use news_pulse::config::Config;
use news_pulse::fetcher::NewsFetcher;
use news_pulse::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "news_pulse=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("NEWS_PULSE_CONFIG").unwrap_or_else(|_| "news.toml".to_string());
    let config = if Path::new(&config_path).exists() {
        Config::load(&config_path)?
    } else {
        warn!("No config at {}, using defaults", config_path);
        Config::default()
    };
    let config = config.with_api_key(std::env::var("NEWS_API_KEY").ok());
    info!(
        "Proxying {} (cache {}s, client poll {}s)",
        config.upstream.base_url, config.upstream.cache_ttl_secs, config.client.poll_interval_secs
    );

    let fetcher = Arc::new(NewsFetcher::new(&config.upstream)?);

    let state = Arc::new(AppState {
        fetcher,
        poll_interval_secs: config.client.poll_interval_secs,
    });

    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Server starting on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
