//! Push Channel Endpoint
//!
//! SSE stream of empty "available-jobs" events, authenticated by runner
//! token. The event carries no payload on purpose: job data only flows
//! through the pull path.

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use reel_core::domain::job::JobType;
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::runner_service;

#[derive(Debug, Deserialize)]
pub struct SocketQuery {
    pub runner_token: String,
    /// Comma-separated list of job types the runner wants pings for
    pub job_types: String,
}

/// GET /api/v1/runners/socket
/// Subscribe to "available-jobs" pings for the given job types
pub async fn available_jobs_socket(
    State(state): State<AppState>,
    Query(query): Query<SocketQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let runner = runner_service::get_runner_from_token(&state.pool, &query.runner_token).await?;

    let job_types = parse_job_types(&query.job_types)?;

    let receiver = state.notifier.subscribe(runner.id, job_types);

    runner_service::update_last_contact(&state.pool, &runner).await?;

    tracing::info!("Runner {} connected to the push channel", runner.name);

    let stream = ReceiverStream::new(receiver)
        .map(|_| Ok(Event::default().event("available-jobs").data("")));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn parse_job_types(raw: &str) -> ApiResult<Vec<JobType>> {
    let mut job_types = Vec::new();

    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let job_type = JobType::from_str(part)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown job type '{}'", part)))?;
        job_types.push(job_type);
    }

    if job_types.is_empty() {
        return Err(ApiError::BadRequest(
            "job_types must name at least one job type".to_string(),
        ));
    }

    Ok(job_types)
}
