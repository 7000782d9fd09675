//! Job task orchestration -- top-level lifecycle for a single job.

use crate::error::{Error, Result};
use crate::job::Job;
use crate::types::{DirectDownload, DownloadMethod};

use super::super::collection::collect_files;
use super::context::JobTaskContext;
use super::fetching::fetch_all;
use super::finalization::{archive_and_complete, finish};

const NO_FILES_MESSAGE: &str = "No files found to download.";

/// Core job task -- drives one job from `pending` to its resting state.
///
/// Phases:
/// 1. Transition to collecting and resolve the selection into files
/// 2. Fail early when nothing was found
/// 3. Direct jobs: hand the links to the client and stop at `ready`
/// 4. Archive jobs: fetch every file through the gate
/// 5. Archive jobs: build the ZIP and complete
///
/// Whatever happens, the job leaves the active map when the task ends.
pub(crate) async fn run_job_task(mut ctx: JobTaskContext) {
    tracing::info!(
        job_id = %ctx.id(),
        qualification = %ctx.job.qualification,
        method = ?ctx.job.download_method,
        "job task started"
    );

    let outcome = run_phases(&mut ctx).await;
    finish(&mut ctx, outcome).await;
    ctx.remove_from_active().await;
}

async fn run_phases(ctx: &mut JobTaskContext) -> Result<()> {
    // Phase 1: Collect file links
    ctx.transition(Job::begin_collecting).await?;

    let work_dir = ctx.downloader.store.work_dir(ctx.id());
    let collected = collect_files(
        &ctx.downloader.catalog,
        &ctx.job,
        &work_dir,
        &ctx.cancel_token,
    )
    .await?;
    ctx.job.errors.extend(collected.errors);
    let entries = collected.entries;

    // Phase 2: Nothing to fetch
    if entries.is_empty() {
        ctx.mark_failed(NO_FILES_MESSAGE).await;
        return Ok(());
    }

    // Phase 3: Direct delivery stops here; the client fetches the files
    if ctx.job.download_method == DownloadMethod::Direct {
        let links: Vec<DirectDownload> = entries.into_iter().map(DirectDownload::from).collect();
        tracing::info!(job_id = %ctx.id(), files = links.len(), "direct links ready");
        return ctx.transition(|job| job.mark_ready(links)).await;
    }

    // Phase 4: Fetch
    let total = entries.len();
    ctx.transition(|job| job.begin_downloading(total)).await?;
    fetch_all(ctx, entries).await?;

    if ctx.cancel_token.is_cancelled() {
        return Err(Error::Cancelled);
    }

    // Phase 5: Package
    archive_and_complete(ctx).await
}
