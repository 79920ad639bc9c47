//! Job API Handlers
//!
//! Admin operations on the local queue: listing and per-type pause/resume.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use reel_core::domain::job::{Job, JobState, JobType};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::job_service;

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default, rename = "type")]
    pub job_type: Option<JobType>,
    #[serde(default)]
    pub state: Option<JobState>,
}

#[derive(Debug, serde::Serialize)]
pub struct ListJobsResult {
    pub total: i64,
    pub data: Vec<Job>,
}

/// GET /api/v1/jobs
/// List jobs of any type and state, newest first
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<ListJobsResult>> {
    let start = query.start.unwrap_or(0).max(0);
    let count = query.count.unwrap_or(20).clamp(1, 100);

    let (total, data) =
        job_service::list_jobs(&state.pool, query.state, query.job_type, start, count).await?;

    Ok(Json(ListJobsResult { total, data }))
}

/// GET /api/v1/jobs/{uuid}
/// Job details
pub async fn get_job(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    let job = job_service::get_job(&state.pool, uuid).await?;

    Ok(Json(job))
}

/// POST /api/v1/jobs/types/{type}/pause
/// Exclude one job type from dequeue until resumed
pub async fn pause_job_type(
    State(state): State<AppState>,
    Path(job_type): Path<String>,
) -> ApiResult<StatusCode> {
    let job_type = parse_job_type(&job_type)?;

    job_service::pause_job_type(&state.pool, job_type).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/jobs/types/{type}/resume
pub async fn resume_job_type(
    State(state): State<AppState>,
    Path(job_type): Path<String>,
) -> ApiResult<StatusCode> {
    let job_type = parse_job_type(&job_type)?;

    job_service::resume_job_type(&state.pool, job_type).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/jobs/types/paused
pub async fn list_paused_job_types(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<JobType>>> {
    let paused = job_service::list_paused_types(&state.pool).await?;

    Ok(Json(paused))
}

fn parse_job_type(raw: &str) -> ApiResult<JobType> {
    JobType::from_str(raw)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown job type '{}'", raw)))
}
