//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::PaperDownloader;

/// Upper bound on how long shutdown waits for running job tasks
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl PaperDownloader {
    /// Gracefully shut down the downloader
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new jobs
    /// 2. Cancels every running job task and closes the fetch gate
    /// 3. Waits for the tasks to settle with a timeout (30 seconds)
    /// 4. Emits [`Event::Shutdown`]
    ///
    /// Cancelled jobs end `failed`; any job still non-terminal on disk is
    /// failed by [`JobStore::load_all`](crate::store::JobStore::load_all) on
    /// the next start.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new jobs
        self.tracking.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new jobs");

        // 2. Cancel running job tasks; queued fetches stop waiting for permits
        self.cancel_all().await;
        self.gate.close();

        // 3. Wait for job tasks to finish with timeout
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_for_active_jobs()).await {
            Ok(()) => tracing::info!("All job tasks finished"),
            Err(_) => tracing::warn!("Timeout waiting for job tasks, proceeding with shutdown"),
        }

        if !self.store.is_durable() {
            tracing::warn!("Last job record write failed; some state was never persisted");
        }

        // 4. Emit shutdown event
        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Signal cancellation to every running job task
    pub(crate) async fn cancel_all(&self) {
        let active = self.tracking.active.lock().await;
        tracing::debug!(active_count = active.len(), "Cancelling all running jobs");

        for (id, token) in active.iter() {
            tracing::debug!(job_id = %id, "Signaling cancellation");
            token.cancel();
        }
    }

    /// Number of job tasks still running
    pub async fn active_job_count(&self) -> usize {
        self.tracking.active.lock().await.len()
    }

    async fn wait_for_active_jobs(&self) {
        loop {
            let active_count = self.active_job_count().await;
            if active_count == 0 {
                return;
            }

            tracing::debug!(active_count, "Waiting for job tasks to finish");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
