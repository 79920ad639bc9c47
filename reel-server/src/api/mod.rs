//! API Module
//!
//! HTTP layer of the scheduling server. The runner protocol lives under
//! `/api/v1/runners`; admin operations are expected to sit behind the
//! deployment's auth proxy.

pub mod error;
pub mod files;
pub mod health;
pub mod job;
pub mod runner;
pub mod runner_job;
pub mod socket;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::service::notifier::JobNotifier;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub notifier: Arc<JobNotifier>,
    pub config: Arc<ServerConfig>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Runner registration
        .route("/api/v1/runners/register", post(runner::register_runner))
        .route("/api/v1/runners/unregister", post(runner::unregister_runner))
        .route("/api/v1/runners", get(runner::list_runners))
        .route("/api/v1/runners/{id}", delete(runner::delete_runner))
        .route(
            "/api/v1/runners/registration-tokens",
            post(runner::generate_registration_token).get(runner::list_registration_tokens),
        )
        .route(
            "/api/v1/runners/registration-tokens/{id}",
            delete(runner::revoke_registration_token),
        )
        // Push channel
        .route("/api/v1/runners/socket", get(socket::available_jobs_socket))
        // Runner job protocol
        .route("/api/v1/runners/jobs/request", post(runner_job::request_jobs))
        .route(
            "/api/v1/runners/jobs/{uuid}/accept",
            post(runner_job::accept_job),
        )
        .route(
            "/api/v1/runners/jobs/{uuid}/update",
            post(runner_job::update_job),
        )
        .route(
            "/api/v1/runners/jobs/{uuid}/success",
            post(runner_job::success_job),
        )
        .route(
            "/api/v1/runners/jobs/{uuid}/error",
            post(runner_job::error_job),
        )
        .route(
            "/api/v1/runners/jobs/{uuid}/files/input",
            get(files::download_input_file),
        )
        // Runner job admin
        .route(
            "/api/v1/runners/jobs/{uuid}/cancel",
            post(runner_job::cancel_job),
        )
        .route("/api/v1/runners/jobs", get(runner_job::list_runner_jobs))
        // Queue admin
        .route("/api/v1/jobs", get(job::list_jobs))
        .route("/api/v1/jobs/types/paused", get(job::list_paused_job_types))
        .route("/api/v1/jobs/types/{type}/pause", post(job::pause_job_type))
        .route(
            "/api/v1/jobs/types/{type}/resume",
            post(job::resume_job_type),
        )
        .route("/api/v1/jobs/{uuid}", get(job::get_job))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
