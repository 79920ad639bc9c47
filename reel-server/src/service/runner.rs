//! Runner Service
//!
//! Registration and management of remote runner processes.

use chrono::Utc;
use reel_core::domain::runner::{Runner, RunnerRegistrationToken};
use reel_core::dto::runner::RegisterRunnerRequest;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::repository::{registration_token_repository, runner_repository};

/// Runners calling in constantly; only persist a contact stamp this often.
const LAST_CONTACT_UPDATE_INTERVAL_SECS: i64 = 30;

/// Service error type
#[derive(Debug)]
pub enum RunnerError {
    NotFound(i64),
    InvalidToken,
    InvalidRegistrationToken,
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for RunnerError {
    fn from(err: sqlx::Error) -> Self {
        RunnerError::DatabaseError(err)
    }
}

impl std::fmt::Display for RunnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunnerError::NotFound(id) => write!(f, "runner {} not found", id),
            RunnerError::InvalidToken => write!(f, "unknown runner token"),
            RunnerError::InvalidRegistrationToken => write!(f, "unknown registration token"),
            RunnerError::ValidationError(msg) => write!(f, "validation error: {}", msg),
            RunnerError::DatabaseError(err) => write!(f, "database error: {}", err),
        }
    }
}

impl std::error::Error for RunnerError {}

pub type Result<T> = std::result::Result<T, RunnerError>;

/// Register a runner against a registration token
///
/// Returns the created runner, including the freshly generated per-runner
/// secret the caller must keep.
pub async fn register_runner(pool: &SqlitePool, req: RegisterRunnerRequest) -> Result<Runner> {
    validate_register_request(&req)?;

    let registration_token =
        registration_token_repository::find_by_secret(pool, &req.registration_token)
            .await?
            .ok_or(RunnerError::InvalidRegistrationToken)?;

    let token = generate_runner_token();

    let runner = runner_repository::create(
        pool,
        &req.name,
        req.description.as_deref(),
        &token,
        registration_token.id,
    )
    .await?;

    tracing::info!("Runner {} registered (id {})", runner.name, runner.id);

    Ok(runner)
}

/// Remove a runner by its own token (self-unregister)
pub async fn unregister_runner(pool: &SqlitePool, runner_token: &str) -> Result<()> {
    let deleted = runner_repository::delete_by_token(pool, runner_token).await?;

    if !deleted {
        return Err(RunnerError::InvalidToken);
    }

    tracing::info!("Runner unregistered");

    Ok(())
}

/// Resolve a runner from its secret token. The authentication boundary for
/// every runner-facing call.
pub async fn get_runner_from_token(pool: &SqlitePool, runner_token: &str) -> Result<Runner> {
    runner_repository::find_by_token(pool, runner_token)
        .await?
        .ok_or(RunnerError::InvalidToken)
}

/// Stamp runner activity, throttled so chatty runners do not write on every
/// call
pub async fn update_last_contact(pool: &SqlitePool, runner: &Runner) -> Result<()> {
    let elapsed = Utc::now() - runner.last_contact;

    if elapsed.num_seconds() < LAST_CONTACT_UPDATE_INTERVAL_SECS {
        return Ok(());
    }

    runner_repository::update_last_contact(pool, runner.id).await?;

    tracing::debug!("Updated last contact for runner {}", runner.name);

    Ok(())
}

/// List all runners (admin)
pub async fn list_runners(pool: &SqlitePool) -> Result<Vec<Runner>> {
    Ok(runner_repository::list_all(pool).await?)
}

/// Revoke a runner by ID (admin)
pub async fn delete_runner(pool: &SqlitePool, id: i64) -> Result<()> {
    let deleted = runner_repository::delete(pool, id).await?;

    if !deleted {
        return Err(RunnerError::NotFound(id));
    }

    tracing::info!("Runner {} deleted", id);

    Ok(())
}

// =============================================================================
// Registration tokens
// =============================================================================

pub async fn generate_registration_token(pool: &SqlitePool) -> Result<RunnerRegistrationToken> {
    let secret = format!("rrt-{}", Uuid::new_v4());

    let token = registration_token_repository::create(pool, &secret).await?;

    tracing::info!("Runner registration token {} generated", token.id);

    Ok(token)
}

pub async fn list_registration_tokens(
    pool: &SqlitePool,
) -> Result<Vec<(RunnerRegistrationToken, i64)>> {
    Ok(registration_token_repository::list_with_counts(pool).await?)
}

pub async fn revoke_registration_token(pool: &SqlitePool, id: i64) -> Result<()> {
    let deleted = registration_token_repository::delete(pool, id).await?;

    if !deleted {
        return Err(RunnerError::NotFound(id));
    }

    tracing::info!("Runner registration token {} revoked", id);

    Ok(())
}

// =============================================================================
// Validation
// =============================================================================

fn validate_register_request(req: &RegisterRunnerRequest) -> Result<()> {
    if req.name.trim().is_empty() {
        return Err(RunnerError::ValidationError(
            "Runner name cannot be empty".to_string(),
        ));
    }

    if req.name.len() > 100 {
        return Err(RunnerError::ValidationError(
            "Runner name is too long (max 100 characters)".to_string(),
        ));
    }

    Ok(())
}

fn generate_runner_token() -> String {
    format!("rt-{}", Uuid::new_v4())
}
