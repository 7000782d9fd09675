//! Core downloader implementation split into focused submodules.
//!
//! The `PaperDownloader` struct and its methods are organized by domain:
//! - [`jobs`] - Job creation, queries, direct-mode bookkeeping, deletion
//! - [`collection`] - Resolving subject/season selections into file entries
//! - [`job_task`] - Background execution of one job
//! - [`lifecycle`] - Startup and shutdown coordination
//! - [`services`] - Background maintenance

mod collection;
mod job_task;
mod jobs;
mod lifecycle;
mod services;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use collection::parse_season_selectors;

use crate::cache::MetadataCache;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{FetchGate, FileFetcher, HttpFetcher};
use crate::locator::{HtmlLocator, Locator};
use crate::store::JobStore;
use crate::types::{Event, JobId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio_util::sync::CancellationToken;

/// Running-job bookkeeping
#[derive(Clone)]
pub(crate) struct JobTracking {
    /// Cancellation tokens of jobs whose background task is still running
    pub(crate) active: Arc<tokio::sync::Mutex<HashMap<JobId, CancellationToken>>>,
    /// Flag to indicate whether new jobs are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Serializes client-driven transitions (start/finish direct) against each other
    pub(crate) control_lock: Arc<tokio::sync::Mutex<()>>,
}

impl JobTracking {
    fn new() -> Self {
        Self {
            active: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
            accepting_new: Arc::new(AtomicBool::new(true)),
            control_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct PaperDownloader {
    /// Job registry; public so callers and tests can inspect job snapshots
    pub store: Arc<JobStore>,
    /// Qualification/subject/season resolution
    pub(crate) catalog: Arc<Catalog>,
    /// Single-file fetcher shared by every job
    pub(crate) fetcher: Arc<dyn FileFetcher>,
    /// Process-wide fetch concurrency gate
    pub(crate) gate: FetchGate,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Running-job bookkeeping
    pub(crate) tracking: JobTracking,
}

impl PaperDownloader {
    /// Create a new PaperDownloader against the configured remote site
    ///
    /// This initializes all core components:
    /// - Creates the temp directory
    /// - Builds the HTML locator and HTTP fetcher
    /// - Loads job records left by a previous process
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.temp_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create temp directory '{}': {}",
                        config.download.temp_dir.display(),
                        e
                    ),
                ))
            })?;

        let locator = Arc::new(HtmlLocator::new(&config.remote, &config.download)?);
        let fetcher = Arc::new(HttpFetcher::new(&config.download)?);

        let downloader = Self::from_parts(config, locator, fetcher);

        let restored = downloader.store.load_all().await?;
        tracing::info!(
            restored,
            temp_dir = %downloader.config.download.temp_dir.display(),
            max_concurrent = downloader.gate.limit(),
            "Downloader initialized"
        );

        Ok(downloader)
    }

    /// Assemble a downloader from explicit collaborators
    ///
    /// Nothing is read from disk; use [`JobStore::load_all`] to restore records.
    pub fn from_parts(
        config: Config,
        locator: Arc<dyn Locator>,
        fetcher: Arc<dyn FileFetcher>,
    ) -> Self {
        let cache = Arc::new(MetadataCache::new(&config.cache));
        let catalog = Arc::new(Catalog::new(locator, cache, &config.remote.base_url));
        let store = Arc::new(JobStore::new(config.download.temp_dir.clone()));
        let gate = FetchGate::new(config.download.max_concurrent_downloads);

        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        Self {
            store,
            catalog,
            fetcher,
            gate,
            event_tx,
            config: Arc::new(config),
            tracking: JobTracking::new(),
        }
    }

    /// Subscribe to job events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// If a subscriber falls behind by more than 1000 events, it will receive a
    /// `RecvError::Lagged` error.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Catalog browsing service
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
