//! Job registry with an in-memory fast path and per-job JSON records on disk
//!
//! Layout under the configured root:
//! - `jobs/<job_id>.json` - the durable job record
//! - `<job_id>/` - the job's working tree
//! - `<qualification>_<id8>.zip` - the job's archive
//!
//! Readers get whole [`Job`] snapshots behind an `Arc`; a running job's task
//! replaces its snapshot after every file completion with [`JobStore::publish`]
//! and writes it to disk periodically with [`JobStore::save`]. Record files are
//! written to a temporary file in the same directory and renamed into place,
//! so a crash never leaves a torn record behind.

use crate::error::{Error, JobError, Result};
use crate::job::Job;
use crate::types::{JobId, JobRequest};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};


/// Outcome of a durable write
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Durability {
    /// The record reached disk
    Durable,
    /// The write failed; only the in-memory snapshot is current
    MemoryOnly,
}

/// Registry of job state keyed by job ID
pub struct JobStore {
    root: PathBuf,
    jobs: RwLock<HashMap<JobId, Arc<Job>>>,
    /// Serializes record writes so the last rename always carries the newest snapshot
    write_lock: tokio::sync::Mutex<()>,
    durable: AtomicBool,
}

impl JobStore {
    /// Create a store rooted at `root`; directories are created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            jobs: RwLock::new(HashMap::new()),
            write_lock: tokio::sync::Mutex::new(()),
            durable: AtomicBool::new(true),
        }
    }

    /// Root directory for records, working trees and archives
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Working tree for a job
    pub fn work_dir(&self, id: JobId) -> PathBuf {
        self.root.join(id.to_string())
    }

    fn records_dir(&self) -> PathBuf {
        self.root.join("jobs")
    }

    fn record_path(&self, id: JobId) -> PathBuf {
        self.records_dir().join(format!("{id}.json"))
    }

    /// Whether the most recent durable write succeeded
    pub fn is_durable(&self) -> bool {
        self.durable.load(Ordering::SeqCst)
    }

    /// Allocate a job for a validated request and record it as pending
    pub async fn create(&self, request: JobRequest) -> Job {
        let job = Job::new(JobId::new(), request);
        self.save(&job).await;
        job
    }

    /// Look up a job, falling back to its durable record
    pub async fn get(&self, id: JobId) -> Option<Arc<Job>> {
        let cached = self.read_jobs().get(&id).cloned();
        if cached.is_some() {
            return cached;
        }

        let job = self.load_record(&self.record_path(id)).await?;
        if job.job_id != id {
            tracing::warn!(job_id = %id, found = %job.job_id, "job record ID mismatch, ignoring");
            return None;
        }
        let job = Arc::new(job);
        // A concurrent insert wins; it is at least as new as the disk record
        let mut jobs = self.write_jobs();
        Some(jobs.entry(id).or_insert(job).clone())
    }

    /// Look up a job or fail with [`JobError::NotFound`]
    pub async fn require(&self, id: JobId) -> Result<Arc<Job>> {
        self.get(id)
            .await
            .ok_or_else(|| Error::Job(JobError::NotFound { id }))
    }

    /// Replace the in-memory snapshot of a job
    ///
    /// `cleaned` is sticky: once a job's artifacts have been removed, later
    /// snapshots from a still-running task keep the flag set.
    pub fn publish(&self, job: &Job) -> Arc<Job> {
        let mut jobs = self.write_jobs();
        let mut snapshot = job.clone();
        if let Some(existing) = jobs.get(&job.job_id)
            && existing.cleaned
        {
            snapshot.cleaned = true;
        }
        let snapshot = Arc::new(snapshot);
        jobs.insert(job.job_id, snapshot.clone());
        snapshot
    }

    /// Publish a job and write its durable record
    ///
    /// Write failures are logged and swallowed; the returned [`Durability`]
    /// and [`JobStore::is_durable`] report them.
    pub async fn save(&self, job: &Job) -> Durability {
        let _guard = self.write_lock.lock().await;
        // Serialize whatever is newest in memory, not the caller's copy
        let snapshot = self.publish(job);
        self.persist(snapshot).await
    }

    /// Write a snapshot; callers hold `write_lock`
    async fn persist(&self, snapshot: Arc<Job>) -> Durability {
        let id = snapshot.job_id;
        match self.write_record(snapshot).await {
            Ok(()) => {
                self.durable.store(true, Ordering::SeqCst);
                Durability::Durable
            }
            Err(e) => {
                self.durable.store(false, Ordering::SeqCst);
                tracing::warn!(
                    job_id = %id,
                    error = %e,
                    "job record not persisted, state is memory-only"
                );
                Durability::MemoryOnly
            }
        }
    }

    async fn write_record(&self, job: Arc<Job>) -> Result<()> {
        let dir = self.records_dir();
        let path = self.record_path(job.job_id);
        tokio::task::spawn_blocking(move || -> Result<()> {
            std::fs::create_dir_all(&dir)?;
            let bytes = serde_json::to_vec_pretty(job.as_ref())?;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| Error::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| Error::Other(format!("record writer panicked: {e}")))?
    }

    async fn load_record(&self, path: &Path) -> Option<Job> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read job record");
                return None;
            }
        };
        match serde_json::from_slice::<Job>(&bytes) {
            Ok(job) => Some(job),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt job record, ignoring");
                None
            }
        }
    }

    /// Load every durable record into memory
    ///
    /// Jobs whose task died with a previous process are marked failed. Direct
    /// jobs waiting on the client keep their state and links. Returns how many
    /// records were loaded.
    pub async fn load_all(&self) -> Result<usize> {
        let dir = self.records_dir();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut loaded = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(mut job) = self.load_record(&path).await else {
                continue;
            };
            if job.needs_server_task() {
                tracing::info!(job_id = %job.job_id, status = %job.status(), "marking interrupted job failed");
                job.fail("Interrupted by server restart")?;
                self.save(&job).await;
            } else {
                self.publish(&job);
            }
            loaded += 1;
        }
        Ok(loaded)
    }

    /// All jobs currently held in memory
    pub fn snapshots(&self) -> Vec<Arc<Job>> {
        self.read_jobs().values().cloned().collect()
    }

    /// Remove a job's working tree and mark the record cleaned
    ///
    /// The record itself and the archive stay. Unknown IDs are an error.
    pub async fn delete_artifacts(&self, id: JobId) -> Result<()> {
        self.require(id).await?;

        remove_dir_if_present(&self.work_dir(id)).await?;

        // Flag the newest snapshot; a running task may have moved on since the lookup
        let _guard = self.write_lock.lock().await;
        let snapshot = {
            let mut jobs = self.write_jobs();
            let Some(current) = jobs.get(&id) else {
                return Err(Error::Job(JobError::NotFound { id }));
            };
            let mut updated = current.as_ref().clone();
            updated.cleaned = true;
            let updated = Arc::new(updated);
            jobs.insert(id, updated.clone());
            updated
        };
        self.persist(snapshot).await;
        tracing::info!(job_id = %id, "job artifacts removed");
        Ok(())
    }

    /// Remove a job's archive file, if it has one
    pub async fn delete_archive(&self, id: JobId) -> Result<()> {
        let job = self.require(id).await?;
        if let Some(path) = job.zip_path() {
            match tokio::fs::remove_file(path).await {
                Ok(()) => tracing::debug!(job_id = %id, path = %path.display(), "archive removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn read_jobs(&self) -> std::sync::RwLockReadGuard<'_, HashMap<JobId, Arc<Job>>> {
        self.jobs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_jobs(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<JobId, Arc<Job>>> {
        self.jobs.write().unwrap_or_else(|e| e.into_inner())
    }
}

pub(crate) async fn remove_dir_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
