//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::job::JobError;
use crate::service::runner::RunnerError;
use crate::service::runner_job::BrokerError;
use crate::service::transient_file::FileAccessError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Conflict(String),
    DatabaseError(sqlx::Error),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(uuid) => ApiError::NotFound(format!("Job {} not found", uuid)),
            JobError::InvalidState(msg) => ApiError::BadRequest(msg),
            JobError::ValidationError(msg) => ApiError::BadRequest(msg),
            JobError::DatabaseError(err) => ApiError::DatabaseError(err),
        }
    }
}

impl From<RunnerError> for ApiError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::NotFound(id) => ApiError::NotFound(format!("Runner {} not found", id)),
            RunnerError::InvalidToken => {
                ApiError::Unauthorized("Unknown runner token".to_string())
            }
            RunnerError::InvalidRegistrationToken => {
                ApiError::Unauthorized("Unknown registration token".to_string())
            }
            RunnerError::ValidationError(msg) => ApiError::BadRequest(msg),
            RunnerError::DatabaseError(err) => ApiError::DatabaseError(err),
        }
    }
}

impl From<BrokerError> for ApiError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::NotFound(uuid) => ApiError::NotFound(format!("Job {} not found", uuid)),
            BrokerError::NotPending(uuid) => ApiError::Conflict(format!(
                "Job {} is not in pending state anymore",
                uuid
            )),
            BrokerError::InvalidState(msg) => ApiError::BadRequest(msg),
            BrokerError::ValidationError(msg) => ApiError::BadRequest(msg),
            BrokerError::DatabaseError(err) => ApiError::DatabaseError(err),
        }
    }
}

impl From<FileAccessError> for ApiError {
    fn from(err: FileAccessError) -> Self {
        match err {
            FileAccessError::NotFound(uuid) => {
                ApiError::NotFound(format!("Job {} not found", uuid))
            }
            FileAccessError::Forbidden => {
                ApiError::Unauthorized("File access not authorized".to_string())
            }
            FileAccessError::NoInputFile(uuid) => {
                ApiError::NotFound(format!("Job {} has no input file", uuid))
            }
            FileAccessError::DatabaseError(err) => ApiError::DatabaseError(err),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
