//! Transient File Endpoint
//!
//! Serves job source files to the current claim holder. Authorization is the
//! live `(runner_token, job_token)` pair; once the claim is released the
//! same URL stops working.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::Response,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::{runner_service, transient_file};

#[derive(Debug, Deserialize)]
pub struct FileAccessQuery {
    pub runner_token: String,
    pub job_token: String,
}

/// GET /api/v1/runners/jobs/{uuid}/files/input
/// Download the source file of a claimed job
pub async fn download_input_file(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Query(query): Query<FileAccessQuery>,
) -> ApiResult<Response> {
    let runner = runner_service::get_runner_from_token(&state.pool, &query.runner_token).await?;

    let (job, input_path) =
        transient_file::resolve_input_file(&state.pool, uuid, &runner, &query.job_token).await?;

    let bytes = tokio::fs::read(&input_path).await.map_err(|err| {
        tracing::error!("Cannot read input file of job {}: {}", job.uuid, err);
        ApiError::InternalError("Cannot read job input file".to_string())
    })?;

    runner_service::update_last_contact(&state.pool, &runner).await?;

    Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(bytes))
        .map_err(|err| ApiError::InternalError(err.to_string()))
}
