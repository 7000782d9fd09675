//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the pastpaper-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the pastpaper-dl REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (if enabled)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "pastpaper-dl REST API",
        version = "0.1.0",
        description = "Browse past-paper catalogs and run bulk download jobs with live progress and ZIP packaging",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        // Catalog
        crate::api::routes::list_qualifications,
        crate::api::routes::get_qualification,
        crate::api::routes::list_subjects,
        crate::api::routes::get_subject,
        crate::api::routes::list_seasons,
        crate::api::routes::get_season,
        crate::api::routes::clear_cache,

        // Downloads
        crate::api::routes::create_bulk_download,
        crate::api::routes::create_direct_download,
        crate::api::routes::get_download_progress,
        crate::api::routes::get_download,
        crate::api::routes::download_zip,
        crate::api::routes::start_direct_download,
        crate::api::routes::finish_direct_download,
        crate::api::routes::delete_download,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobId,
        crate::types::JobStatus,
        crate::types::DownloadMethod,
        crate::types::QualificationSummary,
        crate::types::Subject,
        crate::types::Season,
        crate::types::FailedFile,
        crate::types::DirectDownload,
        crate::types::Event,

        // Job views from job.rs
        crate::job::Job,
        crate::job::JobProgress,
        crate::job::CreateJobResponse,

        // API request/response types from routes
        crate::api::routes::DownloadRequest,
        crate::api::routes::SubjectsQuery,
        crate::api::routes::QualificationListResponse,
        crate::api::routes::SubjectListResponse,
        crate::api::routes::SubjectDetailResponse,
        crate::api::routes::SeasonListResponse,
        crate::api::routes::SeasonDetailResponse,
        crate::api::routes::MessageResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "catalog", description = "Catalog browsing - Qualifications, subjects and seasons on the remote site"),
        (name = "downloads", description = "Download jobs - Create, monitor, fetch archives and delete"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_every_route() {
        let spec = ApiDoc::openapi();
        let paths: Vec<&str> = spec.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/qualifications",
            "/qualifications/{id}/subjects",
            "/qualifications/{id}/subjects/{code}/seasons/{season_id}",
            "/downloads/bulk",
            "/downloads/{id}/zip",
            "/downloads/{id}/start-direct",
            "/health",
            "/events",
        ] {
            assert!(paths.contains(&expected), "missing path {expected}");
        }
    }

    #[test]
    fn spec_has_schemas_and_tags() {
        let spec = ApiDoc::openapi();

        let components = spec.components.expect("components");
        assert!(components.schemas.contains_key("JobProgress"));
        assert!(components.schemas.contains_key("ApiError"));

        let tags = spec.tags.expect("tags");
        let tag_names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tag_names, vec!["catalog", "downloads", "system"]);
    }
}
