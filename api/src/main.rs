mod routes;

use harf::{downloader, AppState, Config};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,harf=debug,harf_api=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!("Using data directory: {:?}", config.data_dir);

    if let Some(manifest) = downloader::ensure_corpus(&config).await? {
        tracing::info!("Fetched {} verses (sha256 {})", manifest.verse_count, manifest.sha256);
    }

    let state = Arc::new(AppState::new(&config)?);
    tracing::info!("Serving {} verses", state.search_engine.verse_count()?);

    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
