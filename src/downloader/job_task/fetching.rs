//! Concurrent fetching of a job's files.

use crate::error::{Error, Result};
use crate::types::{Event, FailedFile, FileEntry};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::sync::Arc;

use super::context::JobTaskContext;

/// Fetch every entry through the shared gate, recording completions as they arrive
///
/// Completions are applied in the order they finish, not the order of
/// `entries`. The snapshot is published after every completion and written to
/// disk every `progress_save_interval` completions and after the last one.
/// Cancellation drops the in-flight fetches and returns [`Error::Cancelled`].
pub(super) async fn fetch_all(ctx: &mut JobTaskContext, entries: Vec<FileEntry>) -> Result<()> {
    let id = ctx.id();
    let total = entries.len();
    let save_every = ctx.downloader.config.download.progress_save_interval.max(1);
    let cancel = ctx.cancel_token.clone();

    let mut pending: FuturesUnordered<_> = entries
        .into_iter()
        .map(|entry| {
            let gate = ctx.downloader.gate.clone();
            let fetcher = Arc::clone(&ctx.downloader.fetcher);
            async move {
                let result = gate
                    .fetch(fetcher.as_ref(), &entry.url, &entry.destination)
                    .await;
                (entry, result)
            }
        })
        .collect();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(job_id = %id, "fetching cancelled");
                return Err(Error::Cancelled);
            }
            next = pending.next() => next,
        };
        let Some((entry, result)) = next else {
            break;
        };

        // Name on disk, which differs from the remote name after deduplication
        let filename = entry
            .destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.filename.clone());

        let failure = match result {
            Ok(()) => {
                tracing::debug!(job_id = %id, file = %filename, "file fetched");
                None
            }
            Err(e) => {
                tracing::warn!(job_id = %id, file = %filename, url = %entry.url, error = %e, "file fetch failed");
                Some(FailedFile {
                    filename: filename.clone(),
                    url: entry.url.clone(),
                    error: e.to_string(),
                })
            }
        };
        let error = failure.as_ref().map(|f| f.error.clone());
        ctx.job.record_fetch(filename.clone(), failure);

        let current = ctx.job.current_file();
        if current % save_every == 0 || current == total {
            ctx.save().await;
        } else {
            ctx.publish();
        }

        ctx.downloader.emit_event(Event::FileFinished {
            id,
            filename,
            error,
            current_file: current,
            total_files: total,
            percentage: ctx.job.percentage(),
        });
    }

    tracing::info!(
        job_id = %id,
        downloaded = ctx.job.downloaded_files.len(),
        failed = ctx.job.failed_files.len(),
        "fetching finished"
    );
    Ok(())
}
