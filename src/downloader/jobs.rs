//! Job operations -- creation, queries, client-driven direct transitions, deletion.

use crate::catalog::qualification;
use crate::error::{Error, JobError, Result};
use crate::job::{CreateJobResponse, Job, JobProgress};
use crate::types::{Event, JobId, JobRequest, JobStatus};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

use super::PaperDownloader;
use super::collection::split_selector;
use super::job_task::{JobTaskContext, run_job_task};

impl PaperDownloader {
    /// Create a job and start its background task
    ///
    /// The request is validated before anything is allocated: at least one
    /// subject and one season must be selected, the qualification must be
    /// known, and every season selector must have the form
    /// `"subjectCode:seasonId"`. The returned response is sent before any
    /// remote page is read; collection and fetching happen in the background.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once [`PaperDownloader::shutdown`] has begun
    /// - [`Error::InvalidRequest`] for a rejected request
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pastpaper_dl::*;
    /// # async fn example(downloader: PaperDownloader) -> Result<()> {
    /// let created = downloader
    ///     .create_job(JobRequest {
    ///         qualification: "IGCSE".into(),
    ///         subjects: vec!["0580".into()],
    ///         seasons: vec!["0580:2023 Oct Nov".into()],
    ///         download_method: DownloadMethod::Zip,
    ///     })
    ///     .await?;
    /// println!("poll {}", created.job_id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_job(&self, request: JobRequest) -> Result<CreateJobResponse> {
        if !self.tracking.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        let request = validate_request(request)?;

        let job = self.store.create(request).await;
        let id = job.job_id;

        let cancel_token = CancellationToken::new();
        self.tracking
            .active
            .lock()
            .await
            .insert(id, cancel_token.clone());

        self.emit_event(Event::JobCreated {
            id,
            qualification: job.qualification.clone(),
            method: job.download_method,
        });
        tracing::info!(
            job_id = %id,
            qualification = %job.qualification,
            subjects = job.subjects.len(),
            seasons = job.seasons.len(),
            method = ?job.download_method,
            "job created"
        );

        let ctx = JobTaskContext::new(job, cancel_token, self.clone());
        tokio::spawn(run_job_task(ctx));

        Ok(CreateJobResponse {
            job_id: id,
            status: JobStatus::Pending,
            total_files: 0,
            message: "Starting download... Please wait.".to_string(),
        })
    }

    /// Current snapshot of a job
    pub async fn get_job(&self, id: JobId) -> Result<Arc<Job>> {
        self.store.require(id).await
    }

    /// Progress view of a job
    pub async fn job_progress(&self, id: JobId) -> Result<JobProgress> {
        Ok(self.store.require(id).await?.progress())
    }

    /// Path and file name of a completed job's archive
    ///
    /// # Errors
    ///
    /// - [`JobError::NotFound`] for an unknown job
    /// - [`JobError::NotCompleted`] while the job has not completed
    /// - [`JobError::ArchiveMissing`] when a completed job has no archive on
    ///   disk (direct jobs, or an archive already removed)
    pub async fn archive_for_download(&self, id: JobId) -> Result<(PathBuf, String)> {
        let job = self.store.require(id).await?;
        if job.status() != JobStatus::Completed {
            return Err(JobError::NotCompleted {
                id,
                status: job.status(),
            }
            .into());
        }

        let (Some(path), Some(name)) = (job.zip_path(), job.zip_filename()) else {
            return Err(JobError::ArchiveMissing { id }.into());
        };
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            tracing::warn!(job_id = %id, path = %path.display(), "archive recorded but missing on disk");
            return Err(JobError::ArchiveMissing { id }.into());
        }
        Ok((path.to_path_buf(), name.to_string()))
    }

    /// Record that the client started fetching a direct job's links (`ready → downloading`)
    pub async fn start_direct(&self, id: JobId) -> Result<Arc<Job>> {
        self.apply_client_transition(id, Job::start_direct).await
    }

    /// Record that the client finished fetching a direct job's links (`downloading → completed`)
    pub async fn finish_direct(&self, id: JobId) -> Result<Arc<Job>> {
        let job = self.apply_client_transition(id, Job::finish_direct).await?;
        self.emit_event(Event::JobCompleted {
            id,
            downloaded: job.total_files(),
            failed: 0,
            zip_filename: None,
        });
        Ok(job)
    }

    async fn apply_client_transition(
        &self,
        id: JobId,
        apply: impl FnOnce(&mut Job) -> std::result::Result<(), JobError>,
    ) -> Result<Arc<Job>> {
        let _guard = self.tracking.control_lock.lock().await;
        let mut job = self.store.require(id).await?.as_ref().clone();
        apply(&mut job)?;
        self.store.save(&job).await;

        tracing::info!(job_id = %id, status = %job.status(), "direct job updated");
        self.emit_event(Event::StatusChanged {
            id,
            status: job.status(),
            message: job.message.clone(),
        });
        self.store.require(id).await
    }

    /// Delete a job's working tree, cancelling its task if it is still running
    ///
    /// The job record stays queryable and is flagged `cleaned`; the archive,
    /// if any, is left for the maintenance sweep.
    pub async fn delete_job(&self, id: JobId) -> Result<()> {
        // Validate existence before touching anything
        self.store.require(id).await?;

        if let Some(token) = self.tracking.active.lock().await.get(&id) {
            tracing::info!(job_id = %id, "cancelling running job before deletion");
            token.cancel();
        }

        self.store.delete_artifacts(id).await?;
        self.emit_event(Event::JobCleaned { id });
        Ok(())
    }
}

fn validate_request(mut request: JobRequest) -> Result<JobRequest> {
    if request.subjects.is_empty() {
        return Err(Error::invalid_request("subjects", "No subjects selected"));
    }
    if request.seasons.is_empty() {
        return Err(Error::invalid_request("seasons", "No seasons selected"));
    }

    let Some(known) = qualification(&request.qualification) else {
        return Err(Error::invalid_request(
            "qualification",
            format!("Unknown qualification '{}'", request.qualification),
        ));
    };
    request.qualification = known.id.to_string();

    if let Some(bad) = request.seasons.iter().find(|s| split_selector(s).is_none()) {
        return Err(Error::invalid_request(
            "seasons",
            format!("Invalid season selector '{bad}', expected 'subjectCode:seasonId'"),
        ));
    }

    Ok(request)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DownloadMethod;

    fn request(subjects: &[&str], seasons: &[&str]) -> JobRequest {
        JobRequest {
            qualification: "igcse".into(),
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            seasons: seasons.iter().map(|s| s.to_string()).collect(),
            download_method: DownloadMethod::Zip,
        }
    }

    fn message(err: Error) -> String {
        match err {
            Error::InvalidRequest { message, .. } => message,
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn empty_subjects_rejected_first() {
        let err = validate_request(request(&[], &[])).unwrap_err();
        assert_eq!(message(err), "No subjects selected");
    }

    #[test]
    fn empty_seasons_rejected() {
        let err = validate_request(request(&["0580"], &[])).unwrap_err();
        assert_eq!(message(err), "No seasons selected");
    }

    #[test]
    fn unknown_qualification_rejected() {
        let mut req = request(&["0580"], &["0580:2023"]);
        req.qualification = "GCSE".into();
        let err = validate_request(req).unwrap_err();
        assert!(message(err).contains("GCSE"));
    }

    #[test]
    fn selector_without_colon_rejected() {
        let err = validate_request(request(&["0580"], &["0580-2023"])).unwrap_err();
        assert!(message(err).contains("0580-2023"));
    }

    #[test]
    fn qualification_is_canonicalized() {
        let req = validate_request(request(&["0580"], &["0580:2023 Oct Nov"])).unwrap();
        assert_eq!(req.qualification, "IGCSE");
    }
}
