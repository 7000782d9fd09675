//! Download job record and its state machine

use crate::error::JobError;
use crate::types::{DirectDownload, DownloadMethod, FailedFile, JobId, JobRequest, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use utoipa::ToSchema;

/// A download job
///
/// The background task driving a job owns its `Job` value and publishes
/// snapshots to the [`JobStore`](crate::store::JobStore). Lifecycle fields can
/// only change through the transition methods, which reject any move that is
/// not an edge of the state machine. The archive location is written solely
/// by [`Job::complete_with_archive`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Job {
    /// Job ID
    pub job_id: JobId,
    /// Qualification ID the job was created for
    pub qualification: String,
    /// Requested subject codes
    pub subjects: Vec<String>,
    /// Requested season selectors ("subjectCode:seasonId")
    pub seasons: Vec<String>,
    /// Delivery method
    pub download_method: DownloadMethod,
    status: JobStatus,
    current_file: usize,
    total_files: usize,
    percentage: f64,
    /// Human-readable progress message
    pub message: String,
    /// Fetched file names, in completion order
    pub downloaded_files: Vec<String>,
    /// Files that could not be fetched, in completion order
    pub failed_files: Vec<FailedFile>,
    /// Non-fatal errors recorded while collecting file links
    pub errors: Vec<String>,
    #[schema(value_type = Option<String>)]
    zip_path: Option<PathBuf>,
    zip_filename: Option<String>,
    /// Resolved file links (direct mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_download_urls: Option<Vec<DirectDownload>>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// When the background task started working
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
    /// Whether on-disk artifacts have been removed
    #[serde(default)]
    pub cleaned: bool,
}

impl Job {
    /// Create a pending job for a validated request
    pub fn new(job_id: JobId, request: JobRequest) -> Self {
        Self {
            job_id,
            qualification: request.qualification,
            subjects: request.subjects,
            seasons: request.seasons,
            download_method: request.download_method,
            status: JobStatus::Pending,
            current_file: 0,
            total_files: 0,
            percentage: 0.0,
            message: "Initializing download...".to_string(),
            downloaded_files: Vec::new(),
            failed_files: Vec::new(),
            errors: Vec::new(),
            zip_path: None,
            zip_filename: None,
            direct_download_urls: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            cleaned: false,
        }
    }

    /// Current lifecycle state
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Whether progress depends on a task running in this process
    ///
    /// Direct jobs that are `ready` or `downloading` wait on the client and
    /// survive a restart; every other non-terminal state does not.
    pub fn needs_server_task(&self) -> bool {
        match self.status {
            JobStatus::Completed | JobStatus::Failed | JobStatus::Ready => false,
            JobStatus::Downloading => self.download_method == DownloadMethod::Zip,
            JobStatus::Pending | JobStatus::CollectingFiles | JobStatus::CreatingZip => true,
        }
    }

    /// Files finished so far (success or failure)
    pub fn current_file(&self) -> usize {
        self.current_file
    }

    /// Files discovered during collection
    pub fn total_files(&self) -> usize {
        self.total_files
    }

    /// Progress percentage, 0 to 100
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    /// Archive location, set once the job completes in archive mode
    pub fn zip_path(&self) -> Option<&Path> {
        self.zip_path.as_deref()
    }

    /// Archive file name, set once the job completes in archive mode
    pub fn zip_filename(&self) -> Option<&str> {
        self.zip_filename.as_deref()
    }

    fn can_move_to(&self, to: JobStatus) -> bool {
        use DownloadMethod::{Direct, Zip};
        use JobStatus::*;

        if to == Failed {
            return !self.status.is_terminal();
        }
        matches!(
            (self.status, to, self.download_method),
            (Pending, CollectingFiles, _)
                | (CollectingFiles, Downloading, Zip)
                | (CollectingFiles, Ready, Direct)
                | (Ready, Downloading, Direct)
                | (Downloading, CreatingZip, Zip)
                | (Downloading, Completed, Direct)
                | (CreatingZip, Completed, Zip)
        )
    }

    fn move_to(&mut self, to: JobStatus, message: impl Into<String>) -> Result<(), JobError> {
        if !self.can_move_to(to) {
            return Err(JobError::InvalidTransition {
                id: self.job_id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.message = message.into();
        if to.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// `pending → collecting_files`
    pub fn begin_collecting(&mut self) -> Result<(), JobError> {
        self.move_to(JobStatus::CollectingFiles, "Collecting file URLs from website...")?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// `collecting_files → downloading` for archive jobs, fixing the file total
    pub fn begin_downloading(&mut self, total_files: usize) -> Result<(), JobError> {
        self.move_to(
            JobStatus::Downloading,
            format!("Downloading {total_files} files..."),
        )?;
        self.total_files = total_files;
        self.current_file = 0;
        self.percentage = 0.0;
        Ok(())
    }

    /// Record one finished fetch and recompute progress
    ///
    /// Completions beyond `total_files` are ignored so the counter can never
    /// overtake the total.
    pub fn record_fetch(&mut self, filename: String, failure: Option<FailedFile>) {
        if self.status != JobStatus::Downloading || self.current_file >= self.total_files {
            return;
        }
        self.current_file += 1;
        match failure {
            None => self.downloaded_files.push(filename),
            Some(failed) => self.failed_files.push(failed),
        }
        self.percentage = percentage_of(self.current_file, self.total_files);
    }

    /// `downloading → creating_zip`
    pub fn begin_archiving(&mut self) -> Result<(), JobError> {
        self.move_to(JobStatus::CreatingZip, "Creating ZIP archive...")?;
        self.percentage = self.percentage.max(95.0);
        Ok(())
    }

    /// `creating_zip → completed`, recording where the archive was written
    pub fn complete_with_archive(&mut self, zip_path: PathBuf) -> Result<(), JobError> {
        let message = format!(
            "Download complete! {} files downloaded, {} failed.",
            self.downloaded_files.len(),
            self.failed_files.len()
        );
        self.move_to(JobStatus::Completed, message)?;
        self.zip_filename = zip_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        self.zip_path = Some(zip_path);
        self.percentage = 100.0;
        Ok(())
    }

    /// `collecting_files → ready` for direct jobs, handing over the resolved links
    pub fn mark_ready(&mut self, links: Vec<DirectDownload>) -> Result<(), JobError> {
        let total = links.len();
        self.move_to(
            JobStatus::Ready,
            format!("Ready to download {total} files. Click 'Start Download' to begin."),
        )?;
        self.total_files = total;
        self.direct_download_urls = Some(links);
        Ok(())
    }

    /// `ready → downloading` for direct jobs; the client performs the fetches
    pub fn start_direct(&mut self) -> Result<(), JobError> {
        self.move_to(JobStatus::Downloading, "Downloads started in browser...")
    }

    /// `downloading → completed` for direct jobs, as reported by the client
    pub fn finish_direct(&mut self) -> Result<(), JobError> {
        let message = format!("Download complete! {} files delivered.", self.total_files);
        self.move_to(JobStatus::Completed, message)?;
        self.current_file = self.total_files;
        self.percentage = 100.0;
        Ok(())
    }

    /// Any non-terminal state `→ failed`
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), JobError> {
        self.move_to(JobStatus::Failed, message)
    }

    /// Progress view of this job
    pub fn progress(&self) -> JobProgress {
        JobProgress {
            job_id: self.job_id,
            status: self.status,
            current_file: self.current_file,
            total_files: self.total_files,
            percentage: self.percentage,
            message: self.message.clone(),
            downloaded_files: self.downloaded_files.clone(),
            failed_files: self.failed_files.clone(),
            errors: self.errors.clone(),
            zip_path: self.zip_path.clone(),
            zip_filename: self.zip_filename.clone(),
            direct_download_urls: self.direct_download_urls.clone(),
        }
    }
}

fn percentage_of(current: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * current as f64 / total as f64
    }
}

/// Progress view returned by the progress endpoint
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobProgress {
    /// Job ID
    pub job_id: JobId,
    /// Current lifecycle state
    pub status: JobStatus,
    /// Files finished so far
    pub current_file: usize,
    /// Files in the job
    pub total_files: usize,
    /// Progress percentage (0.0 to 100.0)
    pub percentage: f64,
    /// Human-readable progress message
    pub message: String,
    /// Fetched file names
    pub downloaded_files: Vec<String>,
    /// Files that could not be fetched
    pub failed_files: Vec<FailedFile>,
    /// Collection errors
    pub errors: Vec<String>,
    /// Archive location once completed
    #[schema(value_type = Option<String>)]
    pub zip_path: Option<PathBuf>,
    /// Archive name once completed
    pub zip_filename: Option<String>,
    /// Resolved file links (direct mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_download_urls: Option<Vec<DirectDownload>>,
}

/// Response to a job creation request
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateJobResponse {
    /// Job ID to poll
    pub job_id: JobId,
    /// Status at creation (always "pending")
    pub status: JobStatus,
    /// Files known at creation (always 0; discovered in the background)
    pub total_files: usize,
    /// Human-readable message
    pub message: String,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: DownloadMethod) -> JobRequest {
        JobRequest {
            qualification: "IGCSE".into(),
            subjects: vec!["0580".into()],
            seasons: vec!["0580:2023 Oct Nov".into()],
            download_method: method,
        }
    }

    fn failed(name: &str) -> FailedFile {
        FailedFile {
            filename: name.into(),
            url: format!("https://example.com/{name}"),
            error: "HTTP 404".into(),
        }
    }

    #[test]
    fn new_job_is_pending_with_zeroed_counters() {
        let job = Job::new(JobId::new(), request(DownloadMethod::Zip));

        assert_eq!(job.status(), JobStatus::Pending);
        assert_eq!(job.current_file(), 0);
        assert_eq!(job.total_files(), 0);
        assert_eq!(job.percentage(), 0.0);
        assert_eq!(job.message, "Initializing download...");
        assert!(job.zip_path().is_none());
        assert!(job.started_at.is_none());
    }

    #[test]
    fn archive_path_walks_every_state() {
        let mut job = Job::new(JobId::new(), request(DownloadMethod::Zip));

        job.begin_collecting().unwrap();
        assert!(job.started_at.is_some());
        job.begin_downloading(4).unwrap();
        job.record_fetch("a.pdf".into(), None);
        job.record_fetch("b.pdf".into(), Some(failed("b.pdf")));
        assert_eq!(job.current_file(), 2);
        assert_eq!(job.percentage(), 50.0);

        job.begin_archiving().unwrap();
        assert_eq!(job.status(), JobStatus::CreatingZip);
        assert_eq!(job.percentage(), 95.0);

        job.complete_with_archive(PathBuf::from("/tmp/IGCSE_abcd1234.zip"))
            .unwrap();
        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.percentage(), 100.0);
        assert_eq!(job.zip_filename(), Some("IGCSE_abcd1234.zip"));
        assert_eq!(
            job.message,
            "Download complete! 1 files downloaded, 1 failed."
        );
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn percentage_never_drops_when_archiving_starts() {
        let mut job = Job::new(JobId::new(), request(DownloadMethod::Zip));
        job.begin_collecting().unwrap();
        job.begin_downloading(1).unwrap();
        job.record_fetch("a.pdf".into(), None);
        assert_eq!(job.percentage(), 100.0);

        job.begin_archiving().unwrap();
        assert_eq!(job.percentage(), 100.0);
    }

    #[test]
    fn percentage_matches_counter_after_every_completion() {
        let mut job = Job::new(JobId::new(), request(DownloadMethod::Zip));
        job.begin_collecting().unwrap();
        job.begin_downloading(7).unwrap();

        for i in 0..7 {
            job.record_fetch(format!("{i}.pdf"), None);
            let expected = 100.0 * job.current_file() as f64 / 7.0;
            assert!((job.percentage() - expected).abs() < 1e-9);
            assert!(job.current_file() <= job.total_files());
        }
    }

    #[test]
    fn extra_completions_do_not_overrun_total() {
        let mut job = Job::new(JobId::new(), request(DownloadMethod::Zip));
        job.begin_collecting().unwrap();
        job.begin_downloading(1).unwrap();
        job.record_fetch("a.pdf".into(), None);
        job.record_fetch("b.pdf".into(), None);

        assert_eq!(job.current_file(), 1);
        assert_eq!(job.downloaded_files, vec!["a.pdf".to_string()]);
    }

    #[test]
    fn direct_path_goes_through_ready() {
        let mut job = Job::new(JobId::new(), request(DownloadMethod::Direct));
        job.begin_collecting().unwrap();

        let link = DirectDownload {
            url: "https://example.com/a.pdf".into(),
            filename: "a.pdf".into(),
            subject: "Mathematics (0580)".into(),
            subject_code: "0580".into(),
            season: "2023 Oct Nov".into(),
        };
        job.mark_ready(vec![link]).unwrap();
        assert_eq!(job.status(), JobStatus::Ready);
        assert_eq!(job.total_files(), 1);
        assert_eq!(
            job.message,
            "Ready to download 1 files. Click 'Start Download' to begin."
        );

        job.start_direct().unwrap();
        assert_eq!(job.status(), JobStatus::Downloading);
        assert_eq!(job.message, "Downloads started in browser...");

        job.finish_direct().unwrap();
        assert_eq!(job.status(), JobStatus::Completed);
        assert!(job.zip_path().is_none());
    }

    #[test]
    fn only_client_driven_direct_states_outlive_the_server_task() {
        let mut zip = Job::new(JobId::new(), request(DownloadMethod::Zip));
        assert!(zip.needs_server_task());
        zip.begin_collecting().unwrap();
        zip.begin_downloading(2).unwrap();
        assert!(zip.needs_server_task());

        let mut direct = Job::new(JobId::new(), request(DownloadMethod::Direct));
        direct.begin_collecting().unwrap();
        assert!(direct.needs_server_task());
        direct.mark_ready(Vec::new()).unwrap();
        assert!(!direct.needs_server_task());
        direct.start_direct().unwrap();
        assert!(!direct.needs_server_task());
        direct.finish_direct().unwrap();
        assert!(!direct.needs_server_task());
    }

    #[test]
    fn direct_job_cannot_take_archive_edges() {
        let mut job = Job::new(JobId::new(), request(DownloadMethod::Direct));
        job.begin_collecting().unwrap();

        let err = job.begin_downloading(3).unwrap_err();
        assert!(matches!(
            err,
            JobError::InvalidTransition {
                from: JobStatus::CollectingFiles,
                to: JobStatus::Downloading,
                ..
            }
        ));
    }

    #[test]
    fn archive_job_cannot_be_started_as_direct() {
        let mut job = Job::new(JobId::new(), request(DownloadMethod::Zip));
        assert!(job.start_direct().is_err());
        assert_eq!(job.status(), JobStatus::Pending);
    }

    #[test]
    fn completion_is_unreachable_from_pending() {
        let mut job = Job::new(JobId::new(), request(DownloadMethod::Zip));
        let err = job
            .complete_with_archive(PathBuf::from("/tmp/x.zip"))
            .unwrap_err();

        assert!(matches!(err, JobError::InvalidTransition { .. }));
        assert!(job.zip_path().is_none());
    }

    #[test]
    fn failed_is_terminal() {
        let mut job = Job::new(JobId::new(), request(DownloadMethod::Zip));
        job.begin_collecting().unwrap();
        job.fail("No files found to download.").unwrap();

        assert_eq!(job.status(), JobStatus::Failed);
        assert!(job.completed_at.is_some());
        assert!(job.fail("again").is_err());
        assert!(job.begin_downloading(1).is_err());
    }

    #[test]
    fn record_survives_json_round_trip() {
        let mut job = Job::new(JobId::new(), request(DownloadMethod::Zip));
        job.begin_collecting().unwrap();
        job.begin_downloading(2).unwrap();
        job.record_fetch("a.pdf".into(), None);

        let json = serde_json::to_string(&job).unwrap();
        let restored: Job = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.status(), JobStatus::Downloading);
        assert_eq!(restored.current_file(), 1);
        assert_eq!(restored.total_files(), 2);
        assert_eq!(restored.downloaded_files, job.downloaded_files);
    }

    #[test]
    fn progress_view_serializes_expected_fields() {
        let job = Job::new(JobId::new(), request(DownloadMethod::Zip));
        let json = serde_json::to_value(job.progress()).unwrap();

        assert_eq!(json["status"], "pending");
        assert_eq!(json["percentage"], 0.0);
        assert!(json["zip_path"].is_null());
        assert!(json.get("direct_download_urls").is_none());
    }
}
