//! Core types for pastpaper-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a download job
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Allocate a fresh random job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight characters of the hyphenated form, used in archive names
    pub fn short(&self) -> String {
        self.0.to_string().chars().take(8).collect()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// How the collected files reach the user
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DownloadMethod {
    /// Fetch every file server-side and package them into one ZIP
    #[default]
    Zip,
    /// Hand the resolved file links back to the client
    Direct,
}

/// Job lifecycle state
///
/// Archive jobs run `pending → collecting_files → downloading → creating_zip → completed`.
/// Direct jobs run `pending → collecting_files → ready → downloading → completed`.
/// `failed` is terminal and can be entered from any non-terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, background task not started yet
    Pending,
    /// Crawling the site for file links
    CollectingFiles,
    /// Fetching files (archive mode) or client-side fetch under way (direct mode)
    Downloading,
    /// Packaging fetched files
    CreatingZip,
    /// Direct links resolved and waiting for the client
    Ready,
    /// Finished successfully
    Completed,
    /// Finished unsuccessfully
    Failed,
}

impl JobStatus {
    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::CollectingFiles => "collecting_files",
            JobStatus::Downloading => "downloading",
            JobStatus::CreatingZip => "creating_zip",
            JobStatus::Ready => "ready",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named link found on a listing page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Link {
    /// Visible link text (or file name, for file links)
    pub name: String,
    /// Absolute URL
    pub url: String,
}

/// Qualification with its subject count
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QualificationSummary {
    /// Qualification ID (e.g., "IGCSE")
    pub id: String,
    /// Display name
    pub name: String,
    /// Number of subjects listed, 0 if the listing could not be fetched
    pub subject_count: usize,
}

/// A subject offered under a qualification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Subject {
    /// Syllabus code extracted from the name (e.g., "9709"), empty if none
    pub code: String,
    /// Display name as listed on the site
    pub name: String,
    /// Listing page for the subject's seasons
    pub url: String,
}

/// One exam session of a subject
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Season {
    /// Season ID; identical to the name
    pub id: String,
    /// Display name (e.g., "2023 May June")
    pub name: String,
    /// Year parsed from the name, 0 if none
    pub year: i32,
    /// Listing page for the season's files
    pub url: String,
    /// Number of downloadable files, 0 if the page could not be fetched
    pub file_count: usize,
}

/// A file resolved during collection, with the place it will be written
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    /// Remote file URL
    pub url: String,
    /// Destination path inside the job working tree
    pub destination: PathBuf,
    /// File name written to disk
    pub filename: String,
    /// Subject code the file belongs to
    pub subject_code: String,
    /// Subject display name
    pub subject_name: String,
    /// Season ID the file belongs to
    pub season_id: String,
    /// Season display name
    pub season_name: String,
}

/// A file that could not be fetched
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FailedFile {
    /// File name
    pub filename: String,
    /// Remote URL that was attempted
    pub url: String,
    /// Failure reason ("HTTP 404", "Timeout", ...)
    pub error: String,
}

/// A file link handed to the client in direct mode
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DirectDownload {
    /// Remote file URL
    pub url: String,
    /// File name
    pub filename: String,
    /// Subject display name
    pub subject: String,
    /// Subject code
    pub subject_code: String,
    /// Season display name
    pub season: String,
}

impl From<FileEntry> for DirectDownload {
    fn from(entry: FileEntry) -> Self {
        Self {
            url: entry.url,
            filename: entry.filename,
            subject: entry.subject_name,
            subject_code: entry.subject_code,
            season: entry.season_name,
        }
    }
}

/// Request to create a download job
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobRequest {
    /// Qualification ID (e.g., "AICE", "IGCSE", "O")
    pub qualification: String,
    /// Subject codes, in the order they should be collected
    pub subjects: Vec<String>,
    /// Season selectors of the form "subjectCode:seasonId"
    pub seasons: Vec<String>,
    /// Delivery method (default: zip)
    #[serde(default)]
    pub download_method: DownloadMethod,
}

/// Event emitted during job lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job created and its background task spawned
    JobCreated {
        /// Job ID
        id: JobId,
        /// Qualification requested
        qualification: String,
        /// Delivery method
        method: DownloadMethod,
    },

    /// Job moved to a new lifecycle state
    StatusChanged {
        /// Job ID
        id: JobId,
        /// New status
        status: JobStatus,
        /// Human-readable progress message
        message: String,
    },

    /// One file fetch finished (successfully or not)
    FileFinished {
        /// Job ID
        id: JobId,
        /// File name
        filename: String,
        /// Failure reason, absent on success
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Files finished so far
        current_file: usize,
        /// Files in the job
        total_files: usize,
        /// Progress percentage (0.0 to 100.0)
        percentage: f64,
    },

    /// Job finished successfully
    JobCompleted {
        /// Job ID
        id: JobId,
        /// Files fetched
        downloaded: usize,
        /// Files that failed
        failed: usize,
        /// Archive name, absent for direct jobs
        #[serde(skip_serializing_if = "Option::is_none")]
        zip_filename: Option<String>,
    },

    /// Job failed
    JobFailed {
        /// Job ID
        id: JobId,
        /// Error message
        error: String,
    },

    /// Job artifacts were removed from disk
    JobCleaned {
        /// Job ID
        id: JobId,
    },

    /// Downloader is shutting down
    Shutdown,
}
