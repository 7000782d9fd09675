//! Catalog browsing handlers: qualifications, subjects, seasons.

use super::{
    MessageResponse, QualificationListResponse, SeasonDetailResponse, SeasonListResponse,
    SubjectDetailResponse, SubjectListResponse, SubjectsQuery,
};
use crate::api::AppState;
use crate::catalog::qualification;
use crate::error::{Error, Result};
use crate::types::QualificationSummary;
use axum::{
    Json,
    extract::{Path, Query, State},
};

fn canonical_qualification(id: &str) -> Result<String> {
    qualification(id)
        .map(|q| q.id.to_string())
        .ok_or_else(|| Error::NotFound(format!("Qualification '{id}'")))
}

/// GET /qualifications - List qualifications with subject counts
#[utoipa::path(
    get,
    path = "/qualifications",
    tag = "catalog",
    responses(
        (status = 200, description = "Every supported qualification", body = QualificationListResponse)
    )
)]
pub async fn list_qualifications(State(state): State<AppState>) -> Json<QualificationListResponse> {
    let qualifications = state.downloader.catalog().qualifications().await;
    Json(QualificationListResponse {
        total: qualifications.len(),
        qualifications,
    })
}

/// GET /qualifications/:id - One qualification with its subject count
#[utoipa::path(
    get,
    path = "/qualifications/{id}",
    tag = "catalog",
    params(
        ("id" = String, Path, description = "Qualification ID (AICE, IGCSE, O)")
    ),
    responses(
        (status = 200, description = "Qualification summary", body = QualificationSummary),
        (status = 404, description = "Unknown qualification", body = crate::error::ApiError)
    )
)]
pub async fn get_qualification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QualificationSummary>> {
    let canonical = canonical_qualification(&id)?;
    state
        .downloader
        .catalog()
        .qualifications()
        .await
        .into_iter()
        .find(|q| q.id == canonical)
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("Qualification '{id}'")))
}

/// GET /qualifications/:id/subjects - List subjects of a qualification
#[utoipa::path(
    get,
    path = "/qualifications/{id}/subjects",
    tag = "catalog",
    params(
        ("id" = String, Path, description = "Qualification ID (AICE, IGCSE, O)"),
        SubjectsQuery
    ),
    responses(
        (status = 200, description = "Subjects, optionally filtered", body = SubjectListResponse),
        (status = 404, description = "Unknown qualification", body = crate::error::ApiError),
        (status = 502, description = "Remote site could not be listed", body = crate::error::ApiError)
    )
)]
pub async fn list_subjects(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SubjectsQuery>,
) -> Result<Json<SubjectListResponse>> {
    let canonical = canonical_qualification(&id)?;
    let subjects = state
        .downloader
        .catalog()
        .subjects(&canonical, query.search.as_deref())
        .await?;
    Ok(Json(SubjectListResponse {
        total: subjects.len(),
        subjects,
        qualification: canonical,
    }))
}

/// GET /qualifications/:id/subjects/:code - One subject by syllabus code
#[utoipa::path(
    get,
    path = "/qualifications/{id}/subjects/{code}",
    tag = "catalog",
    params(
        ("id" = String, Path, description = "Qualification ID"),
        ("code" = String, Path, description = "Syllabus code (e.g., 9709)")
    ),
    responses(
        (status = 200, description = "Subject", body = SubjectDetailResponse),
        (status = 404, description = "Unknown qualification or subject", body = crate::error::ApiError),
        (status = 502, description = "Remote site could not be listed", body = crate::error::ApiError)
    )
)]
pub async fn get_subject(
    State(state): State<AppState>,
    Path((id, code)): Path<(String, String)>,
) -> Result<Json<SubjectDetailResponse>> {
    let canonical = canonical_qualification(&id)?;
    let subject = state
        .downloader
        .catalog()
        .subject(&canonical, &code)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!(
                "Subject '{code}' in qualification '{canonical}'"
            ))
        })?;
    Ok(Json(SubjectDetailResponse {
        subject,
        qualification: canonical,
    }))
}

/// GET /qualifications/:id/subjects/:code/seasons - Seasons of a subject, newest first
#[utoipa::path(
    get,
    path = "/qualifications/{id}/subjects/{code}/seasons",
    tag = "catalog",
    params(
        ("id" = String, Path, description = "Qualification ID"),
        ("code" = String, Path, description = "Syllabus code")
    ),
    responses(
        (status = 200, description = "Seasons with file counts", body = SeasonListResponse),
        (status = 404, description = "Unknown qualification or subject", body = crate::error::ApiError),
        (status = 502, description = "Remote site could not be listed", body = crate::error::ApiError)
    )
)]
pub async fn list_seasons(
    State(state): State<AppState>,
    Path((id, code)): Path<(String, String)>,
) -> Result<Json<SeasonListResponse>> {
    let canonical = canonical_qualification(&id)?;
    let seasons = state.downloader.catalog().seasons(&canonical, &code).await?;
    Ok(Json(SeasonListResponse {
        total: seasons.len(),
        seasons,
        subject_code: code,
        qualification: canonical,
    }))
}

/// GET /qualifications/:id/subjects/:code/seasons/:season_id - One season
#[utoipa::path(
    get,
    path = "/qualifications/{id}/subjects/{code}/seasons/{season_id}",
    tag = "catalog",
    params(
        ("id" = String, Path, description = "Qualification ID"),
        ("code" = String, Path, description = "Syllabus code"),
        ("season_id" = String, Path, description = "Season ID (the season name)")
    ),
    responses(
        (status = 200, description = "Season", body = SeasonDetailResponse),
        (status = 404, description = "Unknown qualification, subject or season", body = crate::error::ApiError),
        (status = 502, description = "Remote site could not be listed", body = crate::error::ApiError)
    )
)]
pub async fn get_season(
    State(state): State<AppState>,
    Path((id, code, season_id)): Path<(String, String, String)>,
) -> Result<Json<SeasonDetailResponse>> {
    let canonical = canonical_qualification(&id)?;
    let season = state
        .downloader
        .catalog()
        .season(&canonical, &code, &season_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Season '{season_id}' for subject '{code}'")))?;
    Ok(Json(SeasonDetailResponse {
        season,
        subject_code: code,
        qualification: canonical,
    }))
}

/// POST /cache/clear - Drop every cached catalog entry
#[utoipa::path(
    post,
    path = "/cache/clear",
    tag = "catalog",
    responses(
        (status = 200, description = "Cache cleared", body = MessageResponse)
    )
)]
pub async fn clear_cache(State(state): State<AppState>) -> Json<MessageResponse> {
    state.downloader.catalog().cache().clear();
    Json(MessageResponse::new("Cache cleared"))
}
