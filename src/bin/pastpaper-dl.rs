//! pastpaper-dl server: REST API plus background maintenance.

use pastpaper_dl::{Config, PaperDownloader, run_with_shutdown};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        bind = %config.api.bind_address,
        base_url = %config.remote.base_url,
        "Starting pastpaper-dl"
    );

    let downloader = Arc::new(PaperDownloader::new(config).await?);
    let maintenance = downloader.start_maintenance();
    let server = downloader.spawn_api_server();

    let result = run_with_shutdown(&downloader).await;

    server.abort();
    maintenance.abort();
    result?;

    tracing::info!("pastpaper-dl stopped");
    Ok(())
}
