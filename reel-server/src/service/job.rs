//! Job Service
//!
//! Lifecycle management for the durable job queue: creation (including
//! parent/child graphs), completion and failure cascades, local retry
//! policy, per-type pause, and restart recovery.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::Utc;
use reel_core::domain::job::{Job, JobState, JobType};
use reel_core::domain::payload::{JobPayload, JobPrivatePayload};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::repository::job_repository;
use crate::repository::job_repository::NewJob;
use crate::service::notifier::JobNotifier;

/// Service error type
#[derive(Debug)]
pub enum JobError {
    NotFound(Uuid),
    InvalidState(String),
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for JobError {
    fn from(err: sqlx::Error) -> Self {
        JobError::DatabaseError(err)
    }
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobError::NotFound(uuid) => write!(f, "job {} not found", uuid),
            JobError::InvalidState(msg) => write!(f, "invalid job state: {}", msg),
            JobError::ValidationError(msg) => write!(f, "validation error: {}", msg),
            JobError::DatabaseError(err) => write!(f, "database error: {}", err),
        }
    }
}

impl std::error::Error for JobError {}

pub type Result<T> = std::result::Result<T, JobError>;

/// Options for a single job creation
#[derive(Debug, Clone, Default)]
pub struct CreateJobOptions {
    pub priority: i32,
    /// Do not run before this much time has passed.
    pub delay: Option<Duration>,
    /// Gate this job on another job's completion.
    pub depends_on: Option<Uuid>,
    /// Pre-assigned public identity, for payloads that reference their own
    /// job (e.g. claim-scoped file URLs).
    pub uuid: Option<Uuid>,
}

/// Child descriptor for `create_job_with_children`
#[derive(Debug, Clone)]
pub struct ChildJob {
    pub payload: JobPayload,
    pub private_payload: Option<JobPrivatePayload>,
    pub priority: i32,
    /// Index of an earlier sibling this child is gated on.
    pub depends_on_sibling: Option<usize>,
}

/// Create and enqueue a single job
pub async fn create_job(
    pool: &SqlitePool,
    notifier: &JobNotifier,
    payload: JobPayload,
    private_payload: Option<JobPrivatePayload>,
    options: CreateJobOptions,
) -> Result<Job> {
    let mut new = NewJob::new(payload);
    new.private_payload = private_payload;
    new.priority = options.priority;

    if let Some(uuid) = options.uuid {
        new.uuid = uuid;
    }

    if let Some(dep_uuid) = options.depends_on {
        let dependency = job_repository::find_by_uuid(pool, dep_uuid)
            .await?
            .ok_or(JobError::NotFound(dep_uuid))?;

        new.depends_on_id = Some(dependency.id);
        new.state = match dependency.state {
            JobState::Completed => JobState::Waiting,
            state if state.is_terminal() => JobState::ParentErrored,
            _ => JobState::WaitingParent,
        };
    } else if let Some(delay) = options.delay {
        new.state = JobState::Delayed;
        new.run_at = Some(
            Utc::now()
                + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero()),
        );
    }

    let job = job_repository::create(pool, new).await?;

    tracing::info!("Job created: {} ({})", job.uuid, job.job_type());

    if job.state == JobState::Waiting && job.job_type().is_remote() {
        notifier.notify_pending(job.job_type());
    }

    Ok(job)
}

/// Create a parent job together with its children, atomically.
///
/// The parent sits in `waiting-children` and is excluded from dequeue until
/// every child completes. Children may be gated on an earlier sibling.
pub async fn create_job_with_children(
    pool: &SqlitePool,
    notifier: &JobNotifier,
    parent_payload: JobPayload,
    parent_private_payload: Option<JobPrivatePayload>,
    children: Vec<ChildJob>,
) -> Result<Job> {
    for (index, child) in children.iter().enumerate() {
        if let Some(sibling) = child.depends_on_sibling {
            if sibling >= index {
                return Err(JobError::ValidationError(format!(
                    "child {} can only depend on an earlier sibling, got {}",
                    index, sibling
                )));
            }
        }
    }

    let mut tx = pool.begin().await?;

    let mut parent = NewJob::new(parent_payload);
    parent.private_payload = parent_private_payload;
    parent.pending_children = children.len() as u32;
    parent.state = if children.is_empty() {
        JobState::Waiting
    } else {
        JobState::WaitingChildren
    };

    let parent = job_repository::create(&mut *tx, parent).await?;

    let mut created_children: Vec<Job> = Vec::with_capacity(children.len());

    for child in children {
        let mut new = NewJob::new(child.payload);
        new.private_payload = child.private_payload;
        new.priority = child.priority;
        new.parent_id = Some(parent.id);

        if let Some(sibling) = child.depends_on_sibling {
            new.depends_on_id = Some(created_children[sibling].id);
            new.state = JobState::WaitingParent;
        }

        created_children.push(job_repository::create(&mut *tx, new).await?);
    }

    tx.commit().await?;

    tracing::info!(
        "Job {} ({}) created with {} children",
        parent.uuid,
        parent.job_type(),
        created_children.len()
    );

    for child in &created_children {
        if child.state == JobState::Waiting && child.job_type().is_remote() {
            notifier.notify_pending(child.job_type());
        }
    }

    Ok(parent)
}

/// Get a job by UUID
pub async fn get_job(pool: &SqlitePool, uuid: Uuid) -> Result<Job> {
    job_repository::find_by_uuid(pool, uuid)
        .await?
        .ok_or(JobError::NotFound(uuid))
}

/// List jobs for the admin surface, newest first
pub async fn list_jobs(
    pool: &SqlitePool,
    state: Option<JobState>,
    job_type: Option<JobType>,
    start: i64,
    count: i64,
) -> Result<(i64, Vec<Job>)> {
    let total = job_repository::count_for_admin(pool, state, job_type).await?;
    let jobs = job_repository::list_for_admin(pool, state, job_type, start, count).await?;

    Ok((total, jobs))
}

// =============================================================================
// Completion / failure cascades
// =============================================================================

/// Mark a job completed and unlock everything gated on it
pub async fn complete_job(pool: &SqlitePool, notifier: &JobNotifier, job: &Job) -> Result<()> {
    job_repository::complete(pool, job.id).await?;

    tracing::info!("Job {} ({}) completed", job.uuid, job.job_type());

    on_job_completed(pool, notifier, job).await
}

async fn on_job_completed(pool: &SqlitePool, notifier: &JobNotifier, job: &Job) -> Result<()> {
    // A completed child may be the last one its parent waits for. If the
    // parent already failed because a sibling errored, the conditional
    // updates no-op and this result is discarded.
    if let Some(parent_id) = job.parent_id {
        let remaining = job_repository::decrement_pending_children(pool, parent_id).await?;

        if remaining.is_some_and(|r| r <= 0)
            && job_repository::promote_waiting_children(pool, parent_id).await?
        {
            if let Some(parent) = job_repository::find_by_id(pool, parent_id).await? {
                tracing::info!(
                    "Job {} ({}) has all children completed, now runnable",
                    parent.uuid,
                    parent.job_type()
                );

                if parent.job_type().is_remote() {
                    notifier.notify_pending(parent.job_type());
                }
            }
        }
    }

    // Unlock jobs gated on this one
    for dependent in job_repository::list_dependents(pool, job.id).await? {
        if job_repository::promote_dependent(pool, dependent.id).await? {
            tracing::debug!(
                "Job {} unblocked by completion of {}",
                dependent.uuid,
                job.uuid
            );

            if dependent.job_type().is_remote() {
                notifier.notify_pending(dependent.job_type());
            }
        }
    }

    Ok(())
}

/// Mark a job terminally failed and propagate to parents and dependents
pub async fn fail_job(
    pool: &SqlitePool,
    notifier: &JobNotifier,
    job: &Job,
    error: &str,
) -> Result<()> {
    job_repository::fail(pool, job.id, error).await?;

    tracing::error!("Job {} ({}) failed: {}", job.uuid, job.job_type(), error);

    propagate_terminal_failure(pool, job).await
}

/// Walk the dependency graph outward from a terminally failed job.
///
/// Parents still waiting on children fail immediately (running siblings are
/// left to finish; their completions no-op). Dependents become
/// `parent-errored` right away rather than waiting out a dependency that can
/// never complete.
async fn propagate_terminal_failure(pool: &SqlitePool, source: &Job) -> Result<()> {
    let mut queue: VecDeque<Job> = VecDeque::from([source.clone()]);

    while let Some(job) = queue.pop_front() {
        if let Some(parent_id) = job.parent_id {
            let message = format!("child job {} failed", job.uuid);

            if job_repository::fail_waiting_parent(pool, parent_id, &message).await? {
                if let Some(parent) = job_repository::find_by_id(pool, parent_id).await? {
                    tracing::error!("Job {} failed: {}", parent.uuid, message);
                    queue.push_back(parent);
                }
            }
        }

        for dependent in job_repository::list_dependents(pool, job.id).await? {
            if job_repository::mark_parent_errored(pool, dependent.id).await? {
                tracing::info!(
                    "Job {} marked parent-errored after failure of {}",
                    dependent.uuid,
                    job.uuid
                );
                queue.push_back(dependent);
            }
        }
    }

    Ok(())
}

/// Local retry policy: park the job with its per-type backoff until the
/// attempt budget runs out, then fail it for good.
pub async fn retry_or_fail(
    pool: &SqlitePool,
    notifier: &JobNotifier,
    job: &Job,
    error: &str,
) -> Result<()> {
    if job.attempts >= job.max_attempts {
        return fail_job(pool, notifier, job, error).await;
    }

    let backoff = job.job_type().backoff(job.attempts);
    let run_at = Utc::now()
        + chrono::Duration::from_std(backoff).unwrap_or_else(|_| chrono::Duration::zero());

    job_repository::delay(pool, job.id, run_at, error).await?;

    tracing::warn!(
        "Job {} ({}) attempt {}/{} failed, retrying in {:?}: {}",
        job.uuid,
        job.job_type(),
        job.attempts,
        job.max_attempts,
        backoff,
        error
    );

    Ok(())
}

/// Cancel a job and everything that depends on it.
///
/// Cancellation is immediate at the bookkeeping level; a remote holder
/// cannot be stopped, so its late success/error calls fall into the stale
/// token no-op path.
pub async fn cancel_job(pool: &SqlitePool, uuid: Uuid) -> Result<Job> {
    let job = get_job(pool, uuid).await?;

    if !job_repository::cancel(pool, job.id).await? {
        return Err(JobError::InvalidState(format!(
            "cannot cancel job {} in state {}",
            uuid, job.state
        )));
    }

    tracing::info!("Job {} ({}) cancelled", job.uuid, job.job_type());

    let mut queue: VecDeque<Job> = VecDeque::from([job.clone()]);

    while let Some(current) = queue.pop_front() {
        // A cancelled parent takes its pending children with it
        for child in job_repository::list_children(pool, current.id).await? {
            if job_repository::cancel(pool, child.id).await? {
                tracing::debug!("Job {} cancelled with its parent {}", child.uuid, current.uuid);
                queue.push_back(child);
            }
        }

        // A parent gated on a cancelled child can never complete
        if let Some(parent_id) = current.parent_id {
            let message = format!("child job {} cancelled", current.uuid);

            if job_repository::fail_waiting_parent(pool, parent_id, &message).await? {
                if let Some(parent) = job_repository::find_by_id(pool, parent_id).await? {
                    queue.push_back(parent);
                }
            }
        }

        for dependent in job_repository::list_dependents(pool, current.id).await? {
            if job_repository::mark_parent_errored(pool, dependent.id).await? {
                queue.push_back(dependent);
            }
        }
    }

    get_job(pool, uuid).await
}

// =============================================================================
// Queue maintenance
// =============================================================================

/// Pause dequeue for one job type (persisted)
pub async fn pause_job_type(pool: &SqlitePool, job_type: JobType) -> Result<()> {
    job_repository::pause_type(pool, job_type).await?;
    tracing::info!("Job type {} paused", job_type);
    Ok(())
}

/// Resume dequeue for one job type
pub async fn resume_job_type(pool: &SqlitePool, job_type: JobType) -> Result<()> {
    job_repository::resume_type(pool, job_type).await?;
    tracing::info!("Job type {} resumed", job_type);
    Ok(())
}

pub async fn list_paused_types(pool: &SqlitePool) -> Result<Vec<JobType>> {
    Ok(job_repository::list_paused_types(pool).await?)
}

/// Requeue local jobs left `active` by a crashed or restarted process.
/// Remote claims are untouched; the TTL reaper owns their lifetime.
pub async fn requeue_interrupted(pool: &SqlitePool) -> Result<u64> {
    let requeued = job_repository::requeue_interrupted(pool).await?;

    if requeued > 0 {
        tracing::warn!("Requeued {} interrupted local job(s) after restart", requeued);
    }

    Ok(requeued)
}
