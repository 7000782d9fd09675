//! Background service starters -- cache and artifact maintenance.

use chrono::Utc;

use super::PaperDownloader;

impl PaperDownloader {
    /// Start the maintenance task
    ///
    /// Every `cache.sweep_interval` it evicts expired metadata cache entries
    /// and removes the working tree and archive of terminal jobs that finished
    /// more than `download.cleanup_ttl` ago.
    pub fn start_maintenance(&self) -> tokio::task::JoinHandle<()> {
        let downloader = self.clone();
        let period = self.config.cache.sweep_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                downloader.run_maintenance().await;
            }
        });

        tracing::info!(interval_secs = period.as_secs(), "Maintenance background task started");

        handle
    }

    /// One maintenance pass; returns how many jobs were reaped
    pub async fn run_maintenance(&self) -> usize {
        let evicted = self.catalog.cache().sweep();
        if evicted > 0 {
            tracing::debug!(evicted, "expired cache entries evicted");
        }

        let ttl = chrono::Duration::from_std(self.config.download.cleanup_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        let now = Utc::now();

        let mut reaped = 0;
        for job in self.store.snapshots() {
            let expired = job.status().is_terminal()
                && !job.cleaned
                && job.completed_at.is_some_and(|done| now - done >= ttl);
            if !expired {
                continue;
            }

            let id = job.job_id;
            if let Err(e) = self.store.delete_archive(id).await {
                tracing::warn!(job_id = %id, error = %e, "failed to remove expired archive");
            }
            match self.store.delete_artifacts(id).await {
                Ok(()) => {
                    self.emit_event(crate::types::Event::JobCleaned { id });
                    reaped += 1;
                }
                Err(e) => tracing::warn!(job_id = %id, error = %e, "failed to clean expired job"),
            }
        }

        if reaped > 0 {
            tracing::info!(reaped, "expired jobs cleaned");
        }
        reaped
    }
}
