//! Single-file HTTP fetching under a process-wide concurrency gate

use crate::config::DownloadConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Write buffer size for streamed bodies
const WRITE_BUFFER_SIZE: usize = 8192;

/// Why a single file could not be fetched
///
/// The `Display` form is what gets recorded in a job's `failed_files`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FetchFailure {
    /// The server answered with a non-200 status
    #[error("HTTP {0}")]
    Status(u16),
    /// The request exceeded the configured timeout
    #[error("Timeout")]
    Timeout,
    /// Connection or protocol failure
    #[error("{0}")]
    Transport(String),
    /// The response could not be written to disk
    #[error("{0}")]
    Io(String),
}

/// Downloads one URL to one path
///
/// Implementations never panic past this boundary; every failure is a
/// [`FetchFailure`]. A failed fetch leaves no partial file at `destination`.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Fetch `url` into `destination`, creating parent directories as needed
    async fn fetch(&self, url: &str, destination: &Path) -> std::result::Result<(), FetchFailure>;
}

/// [`FileFetcher`] over a shared reqwest client
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher with the configured timeout and user agent
    ///
    /// Certificate validation is disabled: the past-paper host serves an
    /// incomplete chain that many trust stores reject.
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.download_timeout)
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }

    async fn fetch_inner(
        &self,
        url: &str,
        destination: &Path,
    ) -> std::result::Result<(), FetchFailure> {
        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchFailure::Io(e.to_string()))?;
        }
        let file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| FetchFailure::Io(e.to_string()))?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(classify)?;
            writer
                .write_all(&bytes)
                .await
                .map_err(|e| FetchFailure::Io(e.to_string()))?;
        }
        writer
            .flush()
            .await
            .map_err(|e| FetchFailure::Io(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl FileFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> std::result::Result<(), FetchFailure> {
        let result = self.fetch_inner(url, destination).await;
        if let Err(failure) = &result {
            tracing::debug!(url, error = %failure, "fetch failed");
            // Partial bodies are not kept
            if let Err(e) = tokio::fs::remove_file(destination).await
                && e.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!(path = %destination.display(), error = %e, "failed to remove partial file");
            }
        }
        result
    }
}

fn classify(e: reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::Transport(e.to_string())
    }
}

/// Counting gate bounding in-flight fetches across every job
///
/// Clones share the same permits.
#[derive(Clone)]
pub struct FetchGate {
    permits: Arc<Semaphore>,
    limit: usize,
}

impl FetchGate {
    /// Create a gate admitting `limit` concurrent fetches
    pub fn new(limit: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Configured limit
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits not currently held
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    async fn acquire(&self) -> std::result::Result<OwnedSemaphorePermit, FetchFailure> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| FetchFailure::Transport("fetch gate closed".to_string()))
    }

    /// Run one fetch while holding a permit
    pub async fn fetch(
        &self,
        fetcher: &dyn FileFetcher,
        url: &str,
        destination: &Path,
    ) -> std::result::Result<(), FetchFailure> {
        let _permit = self.acquire().await?;
        fetcher.fetch(url, destination).await
    }

    /// Stop admitting fetches; waiting and future acquisitions fail
    pub fn close(&self) {
        self.permits.close();
    }
}
