//! Shared test helpers: in-memory site and fetcher doubles, and PaperDownloader construction.

use crate::catalog::{extract_syllabus_code, qualification};
use crate::config::Config;
use crate::downloader::PaperDownloader;
use crate::error::LocatorError;
use crate::fetcher::{FetchFailure, FileFetcher};
use crate::job::Job;
use crate::locator::Locator;
use crate::types::{JobId, Link};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

/// Base URL every stub page lives under
pub(crate) const SITE: &str = "https://site.test";

pub(crate) fn subject_url(code: &str) -> String {
    format!("{SITE}/subject/{code}")
}

pub(crate) fn season_url(code: &str, season: &str) -> String {
    format!("{}/{}", subject_url(code), slug(season))
}

fn slug(name: &str) -> String {
    name.replace(' ', "-")
}

/// In-memory past-paper site
///
/// Subjects are keyed by the qualification's href pattern, seasons by the
/// subject page URL, and files by the season page URL, mirroring what the
/// catalog passes to a [`Locator`].
#[derive(Default)]
pub(crate) struct StubLocator {
    subjects: Mutex<HashMap<String, Vec<Link>>>,
    seasons: Mutex<HashMap<String, Vec<Link>>>,
    files: Mutex<HashMap<String, Vec<Link>>>,
    failing_subjects: Mutex<HashSet<String>>,
    failing_files: Mutex<HashSet<String>>,
    subject_calls: AtomicUsize,
    file_calls: AtomicUsize,
}

impl StubLocator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// List a subject under a qualification; its code is taken from the name
    pub(crate) fn add_subject(&self, qualification_id: &str, name: &str) {
        let pattern = qualification(qualification_id).unwrap().pattern;
        let code = extract_syllabus_code(name);
        self.subjects
            .lock()
            .unwrap()
            .entry(pattern.to_string())
            .or_default()
            .push(Link {
                name: name.to_string(),
                url: subject_url(&code),
            });
    }

    /// List a season with `file_count` files named `paper_<i>.pdf`
    pub(crate) fn add_season(&self, code: &str, name: &str, file_count: usize) {
        let url = season_url(code, name);
        self.seasons
            .lock()
            .unwrap()
            .entry(subject_url(code))
            .or_default()
            .push(Link {
                name: name.to_string(),
                url: url.clone(),
            });

        let files = (0..file_count)
            .map(|i| Link {
                name: format!("paper_{i}.pdf"),
                url: format!("https://files.test/{code}/{}/paper_{i}.pdf", slug(name)),
            })
            .collect();
        self.files.lock().unwrap().insert(url, files);
    }

    /// Add one more file link to an existing season
    pub(crate) fn add_file(&self, code: &str, season: &str, name: &str, url: &str) {
        self.files
            .lock()
            .unwrap()
            .entry(season_url(code, season))
            .or_default()
            .push(Link {
                name: name.to_string(),
                url: url.to_string(),
            });
    }

    /// Make the season page of `code`/`season` answer with an error
    pub(crate) fn fail_files_for(&self, code: &str, season: &str) {
        self.failing_files
            .lock()
            .unwrap()
            .insert(season_url(code, season));
    }

    /// Make the subject listing of a qualification answer with an error
    pub(crate) fn fail_subjects_for(&self, qualification_id: &str) {
        let pattern = qualification(qualification_id).unwrap().pattern;
        self.failing_subjects
            .lock()
            .unwrap()
            .insert(pattern.to_string());
    }

    /// How many times a subject listing was requested
    pub(crate) fn subject_calls(&self) -> usize {
        self.subject_calls.load(Ordering::SeqCst)
    }

    /// How many times a season page was listed
    pub(crate) fn file_calls(&self) -> usize {
        self.file_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Locator for StubLocator {
    async fn list_subjects(&self, url: &str, pattern: &str) -> Result<Vec<Link>, LocatorError> {
        self.subject_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_subjects.lock().unwrap().contains(pattern) {
            return Err(LocatorError::Status {
                url: url.to_string(),
                status: 503,
            });
        }
        Ok(self
            .subjects
            .lock()
            .unwrap()
            .get(pattern)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_seasons(&self, url: &str) -> Result<Vec<Link>, LocatorError> {
        Ok(self
            .seasons
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_files(&self, url: &str) -> Result<Vec<Link>, LocatorError> {
        self.file_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_files.lock().unwrap().contains(url) {
            return Err(LocatorError::Status {
                url: url.to_string(),
                status: 500,
            });
        }
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default())
    }
}

/// Fetcher that writes the URL as the file body
///
/// Chosen URLs fail with HTTP 404, every fetch can be delayed, and the peak
/// number of overlapping fetches is recorded.
#[derive(Default)]
pub(crate) struct StubFetcher {
    failing: Mutex<HashSet<String>>,
    delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_delay(delay: Duration) -> Self {
        let fetcher = Self::default();
        *fetcher.delay.lock().unwrap() = delay;
        fetcher
    }

    pub(crate) fn fail_url(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    /// Highest number of fetches seen running at once
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileFetcher for StubFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<(), FetchFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = if self.failing.lock().unwrap().contains(url) {
            Err(FetchFailure::Status(404))
        } else {
            write_body(url, destination).await
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

async fn write_body(url: &str, destination: &Path) -> Result<(), FetchFailure> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FetchFailure::Io(e.to_string()))?;
    }
    tokio::fs::write(destination, url.as_bytes())
        .await
        .map_err(|e| FetchFailure::Io(e.to_string()))
}

/// Test configuration rooted in a fresh temp directory
pub(crate) fn test_config(root: &Path, max_concurrent: usize) -> Config {
    let mut config = Config::default();
    config.download.temp_dir = root.join("temp");
    config.download.max_concurrent_downloads = max_concurrent;
    config.download.progress_save_interval = 10;
    config.remote.base_url = SITE.to_string();
    config
}

/// Helper to create a test PaperDownloader over stub collaborators.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) fn create_test_downloader_with(
    locator: Arc<StubLocator>,
    fetcher: Arc<StubFetcher>,
    max_concurrent: usize,
) -> (PaperDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path(), max_concurrent);
    std::fs::create_dir_all(&config.download.temp_dir).unwrap();

    let downloader = PaperDownloader::from_parts(config, locator, fetcher);
    (downloader, temp_dir)
}

/// Helper to create a test PaperDownloader over an empty site.
pub(crate) fn create_test_downloader() -> (PaperDownloader, tempfile::TempDir) {
    create_test_downloader_with(
        Arc::new(StubLocator::new()),
        Arc::new(StubFetcher::new()),
        3,
    )
}

/// Poll until the job reaches a state matching `done`, failing the test after 10 seconds
pub(crate) async fn wait_for(
    downloader: &PaperDownloader,
    id: JobId,
    done: impl Fn(&Job) -> bool,
) -> Arc<Job> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let job = downloader.get_job(id).await.unwrap();
        if done(&job) {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} stuck in {} ({})",
            job.status(),
            job.message
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll until the job reaches a terminal state or `ready`
pub(crate) async fn wait_for_rest(downloader: &PaperDownloader, id: JobId) -> Arc<Job> {
    wait_for(downloader, id, |job| {
        job.status().is_terminal() || job.status() == crate::types::JobStatus::Ready
    })
    .await
}

/// Poll until the job's background task has left the active map
pub(crate) async fn wait_for_task_exit(downloader: &PaperDownloader, id: JobId) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while downloader.tracking.active.lock().await.contains_key(&id) {
        assert!(tokio::time::Instant::now() < deadline, "task for {id} never exited");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
