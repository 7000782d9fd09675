//! Error types for pastpaper-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Job, Locator, Config, etc.)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::{JobId, JobStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for pastpaper-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pastpaper-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "MAX_CONCURRENT_DOWNLOADS")
        key: Option<String>,
    },

    /// A caller-supplied request was rejected before any job was created
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Human-readable reason the request was rejected
        message: String,
        /// The request field at fault, when there is one
        field: Option<String>,
    },

    /// Job-related error
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// Page listing on the remote site failed
    #[error("locator error: {0}")]
    Locator(#[from] LocatorError),

    /// Catalog entry (qualification, subject, season) not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Building the ZIP archive failed
    #[error("archive error: {0}")]
    Archive(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The job was cancelled while it was running
    #[error("job cancelled")]
    Cancelled,

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for an [`Error::InvalidRequest`] tied to a request field
    pub fn invalid_request(field: &str, message: impl Into<String>) -> Self {
        Error::InvalidRequest {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }
}

/// Job lifecycle errors
#[derive(Debug, Error)]
pub enum JobError {
    /// No job with this ID exists in memory or on disk
    #[error("job {id} not found")]
    NotFound {
        /// The job ID that was not found
        id: JobId,
    },

    /// The requested state change is not an edge of the job state machine
    #[error("job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The job being transitioned
        id: JobId,
        /// Current status
        from: JobStatus,
        /// Requested status
        to: JobStatus,
    },

    /// The archive was requested before the job finished
    #[error("Job is not completed. Current status: {status}")]
    NotCompleted {
        /// The job whose archive was requested
        id: JobId,
        /// Current status
        status: JobStatus,
    },

    /// The job completed but its archive is gone (cleaned or deleted)
    #[error("ZIP file not found for job {id}")]
    ArchiveMissing {
        /// The job whose archive is missing
        id: JobId,
    },
}

/// Failures while listing a remote page
#[derive(Debug, Error)]
pub enum LocatorError {
    /// The page answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    Status {
        /// Page URL
        url: String,
        /// HTTP status code returned
        status: u16,
    },

    /// The request never produced a response
    #[error("request to {url} failed: {reason}")]
    Request {
        /// Page URL
        url: String,
        /// Underlying transport error
        reason: String,
    },

    /// The page URL or a link on it could not be interpreted
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Why it was rejected
        reason: String,
    },
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
/// It follows a standard format with machine-readable error codes,
/// human-readable messages, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "job_not_found",
///     "message": "job error: job 6f1c... not found",
///     "details": {
///       "job_id": "6f1c..."
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
///
/// This trait maps domain errors to appropriate HTTP status codes.
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::InvalidRequest { .. } => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::Job(JobError::NotFound { .. }) => 404,
            Error::Job(JobError::ArchiveMissing { .. }) => 404,

            // 409 Conflict - job is in the wrong state for the operation
            Error::Job(JobError::InvalidTransition { .. }) => 409,
            Error::Job(JobError::NotCompleted { .. }) => 409,
            Error::Cancelled => 409,

            // 500 Internal Server Error - Server-side issues
            Error::Archive(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - the remote site misbehaved
            Error::Locator(_) => 502,
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidRequest { .. } => "validation_error",
            Error::Job(e) => match e {
                JobError::NotFound { .. } => "job_not_found",
                JobError::InvalidTransition { .. } => "invalid_state",
                JobError::NotCompleted { .. } => "job_not_completed",
                JobError::ArchiveMissing { .. } => "archive_missing",
            },
            Error::Locator(_) => "upstream_error",
            Error::NotFound(_) => "not_found",
            Error::Archive(_) => "archive_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Cancelled => "cancelled",
            Error::ShuttingDown => "shutting_down",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::InvalidRequest {
                field: Some(field), ..
            } => Some(serde_json::json!({
                "field": field,
            })),
            Error::Job(JobError::NotFound { id }) | Error::Job(JobError::ArchiveMissing { id }) => {
                Some(serde_json::json!({
                    "job_id": id,
                }))
            }
            Error::Job(JobError::NotCompleted { id, status }) => Some(serde_json::json!({
                "job_id": id,
                "status": status,
            })),
            Error::Job(JobError::InvalidTransition { id, from, to }) => Some(serde_json::json!({
                "job_id": id,
                "current_status": from,
                "requested_status": to,
            })),
            Error::Locator(LocatorError::Status { url, status }) => Some(serde_json::json!({
                "url": url,
                "upstream_status": status,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
