//! # pastpaper-dl
//!
//! Bulk downloader for examination past papers.
//!
//! pastpaper-dl crawls a past-paper site (qualification → subject → season →
//! files), fetches the selected papers concurrently and packages them into a
//! single ZIP archive, or hands the resolved links back for client-side
//! downloading. Jobs run in the background and report progress through
//! polling or an event stream.
//!
//! ## Design
//!
//! - **Event-driven** - Consumers subscribe to job events, no polling required
//! - **Bounded** - One process-wide limit on concurrent file fetches
//! - **Restart-safe** - Job records are written atomically and survive restarts
//! - **Embeddable** - Usable as a library or through the bundled REST server
//!
//! ## Quick Start
//!
//! ```no_run
//! use pastpaper_dl::{Config, DownloadMethod, JobRequest, PaperDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = PaperDownloader::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let created = downloader
//!         .create_job(JobRequest {
//!             qualification: "AICE".to_string(),
//!             subjects: vec!["9709".to_string()],
//!             seasons: vec!["9709:2023 May June".to_string()],
//!             download_method: DownloadMethod::Zip,
//!         })
//!         .await?;
//!     println!("Started job {}", created.job_id);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// ZIP packaging of job output
pub mod archive;
/// Expiring metadata cache
pub mod cache;
/// Qualification, subject and season resolution
pub mod catalog;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Single-file fetching and the shared concurrency gate
pub mod fetcher;
/// Job state machine and views
pub mod job;
/// Remote page listing
pub mod locator;
/// Job registry with durable records
pub mod store;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use downloader::PaperDownloader;
pub use error::{ApiError, Error, ErrorDetail, JobError, LocatorError, Result, ToHttpStatus};
pub use job::{CreateJobResponse, Job, JobProgress};
pub use types::{
    DirectDownload, DownloadMethod, Event, FailedFile, JobId, JobRequest, JobStatus, Season,
    Subject,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use pastpaper_dl::{Config, PaperDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = PaperDownloader::new(Config::default()).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(&downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: &PaperDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
