//! REST API server module
//!
//! Provides an OpenAPI 3.1 compliant REST API for browsing the past-paper
//! catalog and running download jobs.

use crate::{Config, PaperDownloader, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Catalog
/// - `GET /qualifications` - List qualifications with subject counts
/// - `GET /qualifications/:id` - One qualification
/// - `GET /qualifications/:id/subjects` - List subjects (`?search=` filter)
/// - `GET /qualifications/:id/subjects/:code` - One subject
/// - `GET /qualifications/:id/subjects/:code/seasons` - List seasons
/// - `GET /qualifications/:id/subjects/:code/seasons/:season_id` - One season
/// - `POST /cache/clear` - Clear the metadata cache
///
/// ## Downloads
/// - `POST /downloads/bulk` - Start an archive job
/// - `POST /downloads/direct` - Start a direct-link job
/// - `GET /downloads/:id/progress` - Job progress
/// - `GET /downloads/:id` - Full job status
/// - `GET /downloads/:id/zip` - Stream the archive
/// - `POST /downloads/:id/start-direct` - Direct job: client started
/// - `POST /downloads/:id/finish-direct` - Direct job: client finished
/// - `DELETE /downloads/:id` - Cancel and delete a job's files
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream
pub fn create_router(downloader: Arc<PaperDownloader>, config: Arc<Config>) -> Router {
    let state = AppState::new(downloader, config.clone());

    let router = Router::new()
        // Catalog
        .route("/qualifications", get(routes::list_qualifications))
        .route("/qualifications/:id", get(routes::get_qualification))
        .route("/qualifications/:id/subjects", get(routes::list_subjects))
        .route(
            "/qualifications/:id/subjects/:code",
            get(routes::get_subject),
        )
        .route(
            "/qualifications/:id/subjects/:code/seasons",
            get(routes::list_seasons),
        )
        .route(
            "/qualifications/:id/subjects/:code/seasons/:season_id",
            get(routes::get_season),
        )
        .route("/cache/clear", post(routes::clear_cache))
        // Downloads
        .route("/downloads/bulk", post(routes::create_bulk_download))
        .route("/downloads/direct", post(routes::create_direct_download))
        .route(
            "/downloads/:id/progress",
            get(routes::get_download_progress),
        )
        .route("/downloads/:id", get(routes::get_download))
        .route("/downloads/:id", delete(routes::delete_download))
        .route("/downloads/:id/zip", get(routes::download_zip))
        .route(
            "/downloads/:id/start-direct",
            post(routes::start_direct_download),
        )
        .route(
            "/downloads/:id/finish-direct",
            post(routes::finish_direct_download),
        )
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream));

    // Merge Swagger UI routes if enabled in config (before applying state)
    let router = if config.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if config.api.cors_enabled {
        let cors = build_cors_layer(&config.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops or the surrounding task is aborted.
///
/// # Example
///
/// ```no_run
/// use pastpaper_dl::{PaperDownloader, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let downloader = Arc::new(PaperDownloader::new((*config).clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// pastpaper_dl::api::start_api_server(downloader, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(downloader: Arc<PaperDownloader>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(downloader, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
