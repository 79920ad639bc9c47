//! Runner API Handlers
//!
//! Registration endpoints used by runner processes plus the admin surface
//! for runners and registration tokens.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use reel_core::dto::runner::{
    RegisterRunnerRequest, RegisterRunnerResult, RegistrationTokenSummary, RunnerSummary,
    UnregisterRunnerRequest,
};

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::runner_service;

/// POST /api/v1/runners/register
/// Register a runner against a registration token
pub async fn register_runner(
    State(state): State<AppState>,
    Json(req): Json<RegisterRunnerRequest>,
) -> ApiResult<Json<RegisterRunnerResult>> {
    let runner = runner_service::register_runner(&state.pool, req).await?;

    Ok(Json(RegisterRunnerResult {
        id: runner.id,
        runner_token: runner.token,
    }))
}

/// POST /api/v1/runners/unregister
/// Self-unregister by runner token
pub async fn unregister_runner(
    State(state): State<AppState>,
    Json(req): Json<UnregisterRunnerRequest>,
) -> ApiResult<StatusCode> {
    let runner = runner_service::get_runner_from_token(&state.pool, &req.runner_token).await?;

    runner_service::unregister_runner(&state.pool, &req.runner_token).await?;

    state.notifier.unsubscribe(runner.id);

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/runners
/// List registered runners (admin)
pub async fn list_runners(State(state): State<AppState>) -> ApiResult<Json<Vec<RunnerSummary>>> {
    let runners = runner_service::list_runners(&state.pool).await?;

    Ok(Json(runners.into_iter().map(RunnerSummary::from).collect()))
}

/// DELETE /api/v1/runners/{id}
/// Revoke a runner (admin)
pub async fn delete_runner(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    runner_service::delete_runner(&state.pool, id).await?;

    state.notifier.unsubscribe(id);

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/runners/registration-tokens
/// Generate a registration token (admin)
pub async fn generate_registration_token(
    State(state): State<AppState>,
) -> ApiResult<Json<RegistrationTokenSummary>> {
    let token = runner_service::generate_registration_token(&state.pool).await?;

    Ok(Json(RegistrationTokenSummary::from_token(token, 0)))
}

/// GET /api/v1/runners/registration-tokens
/// List registration tokens with usage counts (admin)
pub async fn list_registration_tokens(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RegistrationTokenSummary>>> {
    let tokens = runner_service::list_registration_tokens(&state.pool).await?;

    Ok(Json(
        tokens
            .into_iter()
            .map(|(token, count)| RegistrationTokenSummary::from_token(token, count))
            .collect(),
    ))
}

/// DELETE /api/v1/runners/registration-tokens/{id}
/// Revoke a registration token (admin)
pub async fn revoke_registration_token(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    runner_service::revoke_registration_token(&state.pool, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
