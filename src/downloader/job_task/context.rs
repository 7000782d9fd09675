//! Job task context -- the owned job value and the shared services it talks to.

use crate::error::{JobError, Result};
use crate::job::Job;
use crate::types::{Event, JobId};
use tokio_util::sync::CancellationToken;

use super::super::PaperDownloader;

/// State for one running job task
///
/// The task is the only writer of its job while it runs; every change is
/// made on `job` and then published to the store.
pub(crate) struct JobTaskContext {
    pub(crate) job: Job,
    pub(crate) cancel_token: CancellationToken,
    pub(crate) downloader: PaperDownloader,
}

impl JobTaskContext {
    pub(crate) fn new(job: Job, cancel_token: CancellationToken, downloader: PaperDownloader) -> Self {
        Self {
            job,
            cancel_token,
            downloader,
        }
    }

    pub(super) fn id(&self) -> JobId {
        self.job.job_id
    }

    /// Replace the in-memory snapshot without touching disk
    pub(super) fn publish(&self) {
        self.downloader.store.publish(&self.job);
    }

    /// Publish and write the durable record
    pub(super) async fn save(&self) {
        self.downloader.store.save(&self.job).await;
    }

    pub(super) fn emit_status(&self) {
        self.downloader.emit_event(Event::StatusChanged {
            id: self.id(),
            status: self.job.status(),
            message: self.job.message.clone(),
        });
    }

    /// Apply a state-machine transition, then save and announce it
    pub(super) async fn transition(
        &mut self,
        apply: impl FnOnce(&mut Job) -> std::result::Result<(), JobError>,
    ) -> Result<()> {
        apply(&mut self.job)?;
        self.save().await;
        tracing::debug!(job_id = %self.id(), status = %self.job.status(), "job status changed");
        self.emit_status();
        Ok(())
    }

    /// Mark the job as failed with an error message and emit the failure event.
    pub(super) async fn mark_failed(&mut self, error: &str) {
        if let Err(e) = self.job.fail(error) {
            tracing::warn!(job_id = %self.id(), error = %e, "job already terminal, not marking failed");
            return;
        }
        self.save().await;
        tracing::warn!(job_id = %self.id(), error, "job failed");
        self.downloader.emit_event(Event::JobFailed {
            id: self.id(),
            error: error.to_string(),
        });
    }

    /// Remove this job from the active jobs map.
    pub(super) async fn remove_from_active(&self) {
        let mut active = self.downloader.tracking.active.lock().await;
        active.remove(&self.id());
    }
}
