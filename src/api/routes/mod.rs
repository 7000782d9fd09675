//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`catalog`] - Qualifications, subjects, seasons, cache control
//! - [`downloads`] - Job creation, progress, archive delivery, deletion
//! - [`system`] - Health, events, OpenAPI

use crate::types::{JobId, QualificationSummary, Season, Subject};
use serde::{Deserialize, Serialize};

mod catalog;
mod downloads;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use catalog::*;
pub use downloads::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Query parameters for GET /qualifications/:id/subjects
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubjectsQuery {
    /// Case-insensitive filter on subject name or code
    pub search: Option<String>,
}

/// Request body for POST /downloads/bulk and POST /downloads/direct
///
/// The delivery method is chosen by the endpoint.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadRequest {
    /// Qualification ID (e.g., "AICE", "IGCSE", "O")
    pub qualification: String,
    /// Subject codes, in the order they should be collected
    #[serde(default)]
    pub subjects: Vec<String>,
    /// Season selectors of the form "subjectCode:seasonId"
    #[serde(default)]
    pub seasons: Vec<String>,
}

// ============================================================================
// Response Types
// ============================================================================

/// Response for GET /qualifications
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QualificationListResponse {
    /// Qualifications with subject counts
    pub qualifications: Vec<QualificationSummary>,
    /// Number of qualifications
    pub total: usize,
}

/// Response for GET /qualifications/:id/subjects
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SubjectListResponse {
    /// Matching subjects
    pub subjects: Vec<Subject>,
    /// Number of subjects returned
    pub total: usize,
    /// Canonical qualification ID
    pub qualification: String,
}

/// Response for GET /qualifications/:id/subjects/:code
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SubjectDetailResponse {
    /// The subject
    #[serde(flatten)]
    pub subject: Subject,
    /// Canonical qualification ID
    pub qualification: String,
}

/// Response for GET /qualifications/:id/subjects/:code/seasons
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SeasonListResponse {
    /// Seasons, newest first
    pub seasons: Vec<Season>,
    /// Number of seasons
    pub total: usize,
    /// Subject code
    pub subject_code: String,
    /// Canonical qualification ID
    pub qualification: String,
}

/// Response for GET /qualifications/:id/subjects/:code/seasons/:season_id
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SeasonDetailResponse {
    /// The season
    #[serde(flatten)]
    pub season: Season,
    /// Subject code
    pub subject_code: String,
    /// Canonical qualification ID
    pub qualification: String,
}

/// Plain acknowledgement
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MessageResponse {
    /// Human-readable message
    pub message: String,
}

impl MessageResponse {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Parse a job ID path segment; anything that is not a UUID names no job
pub(crate) fn parse_job_id(raw: &str) -> crate::Result<JobId> {
    raw.parse()
        .map_err(|_| crate::Error::NotFound(format!("Job '{raw}'")))
}
