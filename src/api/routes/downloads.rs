//! Download job handlers.

use super::{DownloadRequest, MessageResponse, parse_job_id};
use crate::api::AppState;
use crate::error::Result;
use crate::job::{CreateJobResponse, Job, JobProgress};
use crate::types::{DownloadMethod, JobRequest};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

async fn create(
    state: &AppState,
    request: DownloadRequest,
    download_method: DownloadMethod,
) -> Result<(StatusCode, Json<CreateJobResponse>)> {
    let created = state
        .downloader
        .create_job(JobRequest {
            qualification: request.qualification,
            subjects: request.subjects,
            seasons: request.seasons,
            download_method,
        })
        .await?;
    Ok((StatusCode::ACCEPTED, Json(created)))
}

/// POST /downloads/bulk - Start an archive job
#[utoipa::path(
    post,
    path = "/downloads/bulk",
    tag = "downloads",
    request_body = DownloadRequest,
    responses(
        (status = 202, description = "Job created; poll its progress", body = CreateJobResponse),
        (status = 400, description = "Invalid selection", body = crate::error::ApiError),
        (status = 503, description = "Server is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn create_bulk_download(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> Result<(StatusCode, Json<CreateJobResponse>)> {
    create(&state, request, DownloadMethod::Zip).await
}

/// POST /downloads/direct - Start a direct-link job
#[utoipa::path(
    post,
    path = "/downloads/direct",
    tag = "downloads",
    request_body = DownloadRequest,
    responses(
        (status = 202, description = "Job created; poll until ready", body = CreateJobResponse),
        (status = 400, description = "Invalid selection", body = crate::error::ApiError),
        (status = 503, description = "Server is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn create_direct_download(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> Result<(StatusCode, Json<CreateJobResponse>)> {
    create(&state, request, DownloadMethod::Direct).await
}

/// GET /downloads/:id/progress - Progress of a job
#[utoipa::path(
    get,
    path = "/downloads/{id}/progress",
    tag = "downloads",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Current progress", body = JobProgress),
        (status = 404, description = "Job not found", body = crate::error::ApiError)
    )
)]
pub async fn get_download_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobProgress>> {
    let id = parse_job_id(&id)?;
    Ok(Json(state.downloader.job_progress(id).await?))
}

/// GET /downloads/:id - Full job status
#[utoipa::path(
    get,
    path = "/downloads/{id}",
    tag = "downloads",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job with its selection and timestamps", body = Job),
        (status = 404, description = "Job not found", body = crate::error::ApiError)
    )
)]
pub async fn get_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Job>> {
    let id = parse_job_id(&id)?;
    let job = state.downloader.get_job(id).await?;
    Ok(Json(job.as_ref().clone()))
}

/// GET /downloads/:id/zip - Stream the archive of a completed job
#[utoipa::path(
    get,
    path = "/downloads/{id}/zip",
    tag = "downloads",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "ZIP archive", content_type = "application/zip"),
        (status = 404, description = "Job or archive not found", body = crate::error::ApiError),
        (status = 409, description = "Job is not completed", body = crate::error::ApiError)
    )
)]
pub async fn download_zip(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let id = parse_job_id(&id)?;
    let (path, filename) = state.downloader.archive_for_download(id).await?;

    let file = tokio::fs::File::open(&path).await?;
    let length = file.metadata().await?.len();
    tracing::debug!(job_id = %id, archive = %path.display(), bytes = length, "serving archive");

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
        (header::CONTENT_LENGTH, length.to_string()),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

/// POST /downloads/:id/start-direct - Client began fetching a direct job's links
#[utoipa::path(
    post,
    path = "/downloads/{id}/start-direct",
    tag = "downloads",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job moved to downloading", body = MessageResponse),
        (status = 404, description = "Job not found", body = crate::error::ApiError),
        (status = 409, description = "Job is not a ready direct job", body = crate::error::ApiError)
    )
)]
pub async fn start_direct_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id = parse_job_id(&id)?;
    state.downloader.start_direct(id).await?;
    Ok(Json(MessageResponse::new("Direct downloads started")))
}

/// POST /downloads/:id/finish-direct - Client finished fetching a direct job's links
#[utoipa::path(
    post,
    path = "/downloads/{id}/finish-direct",
    tag = "downloads",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job completed", body = MessageResponse),
        (status = 404, description = "Job not found", body = crate::error::ApiError),
        (status = 409, description = "Job is not a downloading direct job", body = crate::error::ApiError)
    )
)]
pub async fn finish_direct_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id = parse_job_id(&id)?;
    state.downloader.finish_direct(id).await?;
    Ok(Json(MessageResponse::new("Direct downloads finished")))
}

/// DELETE /downloads/:id - Cancel a job and delete its files
#[utoipa::path(
    delete,
    path = "/downloads/{id}",
    tag = "downloads",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job files deleted", body = MessageResponse),
        (status = 404, description = "Job not found", body = crate::error::ApiError)
    )
)]
pub async fn delete_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id = parse_job_id(&id)?;
    state.downloader.delete_job(id).await?;
    Ok(Json(MessageResponse::new(format!(
        "Job '{id}' deleted successfully"
    ))))
}
