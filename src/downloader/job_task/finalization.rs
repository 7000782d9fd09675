//! Archiving and terminal outcomes.

use crate::archive::Archiver;
use crate::error::{Error, Result};
use crate::job::Job;
use crate::store::remove_dir_if_present;
use crate::types::Event;

use super::context::JobTaskContext;

/// `downloading → creating_zip → completed`
///
/// The archive is built even when every fetch failed; it is then empty.
pub(super) async fn archive_and_complete(ctx: &mut JobTaskContext) -> Result<()> {
    ctx.transition(Job::begin_archiving).await?;

    let temp_root = ctx.downloader.store.root().to_path_buf();
    let zip_path = Archiver::build(ctx.id(), &ctx.job.qualification, &temp_root)
        .await
        .map_err(|e| Error::Archive(format!("Failed to create ZIP archive: {e}")))?;

    ctx.transition(|job| job.complete_with_archive(zip_path)).await?;
    ctx.downloader.emit_event(Event::JobCompleted {
        id: ctx.id(),
        downloaded: ctx.job.downloaded_files.len(),
        failed: ctx.job.failed_files.len(),
        zip_filename: ctx.job.zip_filename().map(str::to_string),
    });
    tracing::info!(
        job_id = %ctx.id(),
        downloaded = ctx.job.downloaded_files.len(),
        failed = ctx.job.failed_files.len(),
        "job completed"
    );
    Ok(())
}

/// Settle the job after its phases returned
///
/// Cancelled jobs lose their working tree; any other error fails the job with
/// its message.
pub(super) async fn finish(ctx: &mut JobTaskContext, outcome: Result<()>) {
    match outcome {
        Ok(()) => {}
        Err(Error::Cancelled) => {
            ctx.mark_failed("Job cancelled").await;
            let work_dir = ctx.downloader.store.work_dir(ctx.id());
            if let Err(e) = remove_dir_if_present(&work_dir).await {
                tracing::warn!(job_id = %ctx.id(), error = %e, "failed to remove working tree of cancelled job");
            }
        }
        Err(Error::Archive(message)) => ctx.mark_failed(&message).await,
        Err(e) => {
            tracing::error!(job_id = %ctx.id(), error = %e, "job task failed");
            ctx.mark_failed(&e.to_string()).await;
        }
    }
}
