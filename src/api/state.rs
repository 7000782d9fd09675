//! Application state for the API server

use crate::{Config, PaperDownloader};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the downloader instance and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The main PaperDownloader instance
    pub downloader: Arc<PaperDownloader>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<PaperDownloader>, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }
}
