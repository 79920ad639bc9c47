//! Runner Job API Handlers
//!
//! The runner-facing claim protocol (request/accept/update/success/error)
//! and the admin operations on runner jobs.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use reel_core::dto::runner_job::{
    AcceptRunnerJobBody, AcceptRunnerJobResult, ErrorRunnerJobBody, ListRunnerJobsQuery,
    ListRunnerJobsResult, RequestRunnerJobBody, RequestRunnerJobResult, SuccessRunnerJobBody,
    UpdateRunnerJobBody,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::{job_service, runner_job_service, runner_service};

/// POST /api/v1/runners/jobs/request
/// List jobs the calling runner could claim
pub async fn request_jobs(
    State(state): State<AppState>,
    Json(body): Json<RequestRunnerJobBody>,
) -> ApiResult<Json<RequestRunnerJobResult>> {
    let runner = runner_service::get_runner_from_token(&state.pool, &body.runner_token).await?;

    let available_jobs =
        runner_job_service::request_jobs(&state.pool, &runner, &body.job_types).await?;

    runner_service::update_last_contact(&state.pool, &runner).await?;

    Ok(Json(RequestRunnerJobResult { available_jobs }))
}

/// POST /api/v1/runners/jobs/{uuid}/accept
/// Claim a pending job; exactly one concurrent caller wins
pub async fn accept_job(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(body): Json<AcceptRunnerJobBody>,
) -> ApiResult<Json<AcceptRunnerJobResult>> {
    let runner = runner_service::get_runner_from_token(&state.pool, &body.runner_token).await?;

    let result = runner_job_service::accept_job(&state.pool, &runner, uuid).await?;

    runner_service::update_last_contact(&state.pool, &runner).await?;

    Ok(Json(result))
}

/// POST /api/v1/runners/jobs/{uuid}/update
/// Heartbeat + progress from the current claim holder
pub async fn update_job(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(body): Json<UpdateRunnerJobBody>,
) -> ApiResult<StatusCode> {
    validate_progress(body.progress)?;

    let runner = runner_service::get_runner_from_token(&state.pool, &body.runner_token).await?;

    runner_job_service::update_job(&state.pool, &runner, uuid, &body.job_token, body.progress)
        .await?;

    runner_service::update_last_contact(&state.pool, &runner).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/runners/jobs/{uuid}/success
/// Successful completion from the current claim holder
pub async fn success_job(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(body): Json<SuccessRunnerJobBody>,
) -> ApiResult<StatusCode> {
    let runner = runner_service::get_runner_from_token(&state.pool, &body.runner_token).await?;

    runner_job_service::success_job(
        &state.pool,
        &state.notifier,
        &runner,
        uuid,
        &body.job_token,
        body.payload,
    )
    .await?;

    runner_service::update_last_contact(&state.pool, &runner).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/runners/jobs/{uuid}/error
/// Failure report from the current claim holder
pub async fn error_job(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(body): Json<ErrorRunnerJobBody>,
) -> ApiResult<StatusCode> {
    let runner = runner_service::get_runner_from_token(&state.pool, &body.runner_token).await?;

    runner_job_service::error_job(
        &state.pool,
        &state.notifier,
        &runner,
        uuid,
        &body.job_token,
        &body.message,
        state.config.runner_max_failures,
    )
    .await?;

    runner_service::update_last_contact(&state.pool, &runner).await?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Admin endpoints
// =============================================================================

/// POST /api/v1/runners/jobs/{uuid}/cancel
/// Cancel a job; any outstanding claim token dies with it
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> ApiResult<StatusCode> {
    job_service::cancel_job(&state.pool, uuid).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/runners/jobs
/// List runner-visible jobs by type/state
pub async fn list_runner_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListRunnerJobsQuery>,
) -> ApiResult<Json<ListRunnerJobsResult>> {
    let result = runner_job_service::list_runner_jobs(&state.pool, query).await?;

    Ok(Json(result))
}

// =============================================================================
// Validation
// =============================================================================

fn validate_progress(progress: Option<u8>) -> ApiResult<()> {
    match progress {
        Some(p) if p > 100 => Err(ApiError::BadRequest(format!(
            "progress must be between 0 and 100, got {}",
            p
        ))),
        _ => Ok(()),
    }
}
