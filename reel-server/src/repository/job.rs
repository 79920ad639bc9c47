//! Job Repository
//!
//! Handles all database operations related to jobs. State transitions that
//! must be race-free (claims, counter updates) are single conditional
//! UPDATEs; `RETURNING` tells the caller whether it won.

use chrono::{DateTime, Utc};
use reel_core::domain::job::{Job, JobState, JobType};
use reel_core::domain::payload::{JobPayload, JobPrivatePayload};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{datetime_to_millis, millis_to_datetime};

const JOB_COLUMNS: &str = "id, uuid, type, state, priority, payload, private_payload, attempts, \
     max_attempts, failures, parent_id, pending_children, depends_on_id, runner_id, \
     processing_job_token, progress, error, run_at, created_at, updated_at, started_at, \
     finished_at";

/// Descriptor for a job about to be enqueued
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Public identity, fixed before insert so payload builders can embed
    /// URLs that reference the job itself.
    pub uuid: Uuid,
    pub payload: JobPayload,
    pub private_payload: Option<JobPrivatePayload>,
    pub state: JobState,
    pub priority: i32,
    pub parent_id: Option<i64>,
    pub pending_children: u32,
    pub depends_on_id: Option<i64>,
    pub run_at: Option<DateTime<Utc>>,
}

impl NewJob {
    pub fn new(payload: JobPayload) -> NewJob {
        NewJob {
            uuid: Uuid::new_v4(),
            payload,
            private_payload: None,
            state: JobState::Waiting,
            priority: 0,
            parent_id: None,
            pending_children: 0,
            depends_on_id: None,
            run_at: None,
        }
    }
}

/// Create a new job record
///
/// Takes any executor so job graphs can be inserted inside one transaction.
pub async fn create<'e, E>(executor: E, new: NewJob) -> Result<Job, sqlx::Error>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let uuid = new.uuid;
    let now = Utc::now();
    let job_type = new.payload.job_type();

    let payload_json = serde_json::to_string(&new.payload).map_err(encode_err)?;
    let private_json = new
        .private_payload
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(encode_err)?;

    let result = sqlx::query(
        r#"
        INSERT INTO jobs (uuid, type, state, priority, payload, private_payload,
                          max_attempts, parent_id, pending_children, depends_on_id,
                          run_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
        "#,
    )
    .bind(uuid.to_string())
    .bind(job_type.as_str())
    .bind(new.state.as_str())
    .bind(new.priority)
    .bind(&payload_json)
    .bind(private_json.as_deref())
    .bind(job_type.max_attempts() as i64)
    .bind(new.parent_id)
    .bind(new.pending_children as i64)
    .bind(new.depends_on_id)
    .bind(new.run_at.map(datetime_to_millis))
    .bind(datetime_to_millis(now))
    .execute(executor)
    .await?;

    Ok(Job {
        id: result.last_insert_rowid(),
        uuid,
        state: new.state,
        payload: new.payload,
        private_payload: new.private_payload,
        priority: new.priority,
        attempts: 0,
        max_attempts: job_type.max_attempts(),
        failures: 0,
        parent_id: new.parent_id,
        pending_children: new.pending_children,
        depends_on_id: new.depends_on_id,
        runner_id: None,
        processing_job_token: None,
        progress: None,
        error: None,
        run_at: new.run_at,
        created_at: now,
        updated_at: now,
        started_at: None,
        finished_at: None,
    })
}

/// Find a job by internal ID
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Job>, sqlx::Error> {
    let row = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Job::try_from).transpose()
}

/// Find a job by public UUID
pub async fn find_by_uuid(pool: &SqlitePool, uuid: Uuid) -> Result<Option<Job>, sqlx::Error> {
    let row = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE uuid = $1"
    ))
    .bind(uuid.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(Job::try_from).transpose()
}

/// List jobs a runner could claim: waiting, remote type, type not paused.
/// Most urgent first (priority ascending, then insertion order).
pub async fn list_claimable(pool: &SqlitePool, limit: i64) -> Result<Vec<Job>, sqlx::Error> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        r#"
        SELECT {JOB_COLUMNS}
        FROM jobs
        WHERE state = 'waiting'
          AND type IN ({})
          AND type NOT IN (SELECT type FROM paused_job_types)
        ORDER BY priority ASC, id ASC
        LIMIT $1
        "#,
        type_list(&JobType::REMOTE)
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Job::try_from).collect()
}

/// List waiting jobs of one (local) type for the in-process workers
pub async fn list_waiting_by_type(
    pool: &SqlitePool,
    job_type: JobType,
    limit: i64,
) -> Result<Vec<Job>, sqlx::Error> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        r#"
        SELECT {JOB_COLUMNS}
        FROM jobs
        WHERE state = 'waiting'
          AND type = $1
          AND type NOT IN (SELECT type FROM paused_job_types)
        ORDER BY priority ASC, id ASC
        LIMIT $2
        "#
    ))
    .bind(job_type.as_str())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Job::try_from).collect()
}

// =============================================================================
// Claims
// =============================================================================

/// Atomically claim a job for a remote runner.
///
/// Succeeds only if the job is still `waiting`; exactly one of any number of
/// concurrent callers gets the row back.
pub async fn claim_for_runner(
    pool: &SqlitePool,
    id: i64,
    runner_id: i64,
    job_token: &str,
) -> Result<Option<Job>, sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    let row = sqlx::query_as::<_, JobRow>(
        r#"
        UPDATE jobs
        SET state = 'active', runner_id = $1, processing_job_token = $2,
            started_at = $3, updated_at = $3, progress = NULL
        WHERE id = $4 AND state = 'waiting'
        RETURNING *
        "#,
    )
    .bind(runner_id)
    .bind(job_token)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Job::try_from).transpose()
}

/// Atomically claim a job for an in-process worker, consuming one attempt
pub async fn claim_for_worker(pool: &SqlitePool, id: i64) -> Result<Option<Job>, sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    let row = sqlx::query_as::<_, JobRow>(
        r#"
        UPDATE jobs
        SET state = 'active', attempts = attempts + 1, started_at = $1, updated_at = $1
        WHERE id = $2 AND state = 'waiting'
        RETURNING *
        "#,
    )
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Job::try_from).transpose()
}

/// Heartbeat from the current claim holder; also records progress.
/// Returns false when the token no longer matches (stale claim).
pub async fn heartbeat(
    pool: &SqlitePool,
    id: i64,
    job_token: &str,
    progress: Option<u8>,
) -> Result<bool, sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET updated_at = $1, progress = COALESCE($2, progress)
        WHERE id = $3 AND state = 'active' AND processing_job_token = $4
        "#,
    )
    .bind(now)
    .bind(progress.map(|p| p as i64))
    .bind(id)
    .bind(job_token)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Transitions
// =============================================================================

/// Terminal success. Clears the claim so outstanding tokens die with it.
pub async fn complete(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    sqlx::query(
        r#"
        UPDATE jobs
        SET state = 'completed', processing_job_token = NULL, progress = 100,
            finished_at = $1, updated_at = $1
        WHERE id = $2
        "#,
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Terminal failure
pub async fn fail(pool: &SqlitePool, id: i64, error: &str) -> Result<(), sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    sqlx::query(
        r#"
        UPDATE jobs
        SET state = 'failed', error = $1, processing_job_token = NULL,
            finished_at = $2, updated_at = $2
        WHERE id = $3
        "#,
    )
    .bind(error)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Cancel a job unless it already reached a terminal state
pub async fn cancel(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET state = 'cancelled', processing_job_token = NULL, runner_id = NULL,
            finished_at = $1, updated_at = $1
        WHERE id = $2
          AND state NOT IN ('completed', 'failed', 'parent-errored', 'cancelled')
        "#,
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Mark a dependent job as terminally errored because its dependency failed
pub async fn mark_parent_errored(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET state = 'parent-errored', processing_job_token = NULL,
            finished_at = $1, updated_at = $1
        WHERE id = $2
          AND state NOT IN ('completed', 'failed', 'parent-errored', 'cancelled')
        "#,
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Return a job to the waiting pool, clearing any claim.
/// Used after a runner `error()` below the failure budget.
pub async fn release_to_waiting(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    sqlx::query(
        r#"
        UPDATE jobs
        SET state = 'waiting', runner_id = NULL, processing_job_token = NULL,
            started_at = NULL, progress = NULL, updated_at = $1
        WHERE id = $2
        "#,
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Reaper requeue: only valid while the stale claim is still in place, so a
/// holder that finished in the meantime is left alone.
pub async fn requeue_stalled(
    pool: &SqlitePool,
    id: i64,
    job_token: &str,
) -> Result<bool, sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET state = 'waiting', runner_id = NULL, processing_job_token = NULL,
            started_at = NULL, progress = NULL, updated_at = $1
        WHERE id = $2 AND state = 'active' AND processing_job_token = $3
        "#,
    )
    .bind(now)
    .bind(id)
    .bind(job_token)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Count one explicit runner failure, returning the new total
pub async fn increment_failures(pool: &SqlitePool, id: i64) -> Result<u32, sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    let failures: i64 = sqlx::query_scalar(
        r#"
        UPDATE jobs
        SET failures = failures + 1, updated_at = $1
        WHERE id = $2
        RETURNING failures
        "#,
    )
    .bind(now)
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(failures as u32)
}

/// Park a local job until `run_at` (retry backoff)
pub async fn delay(
    pool: &SqlitePool,
    id: i64,
    run_at: DateTime<Utc>,
    error: &str,
) -> Result<(), sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    sqlx::query(
        r#"
        UPDATE jobs
        SET state = 'delayed', run_at = $1, error = $2, updated_at = $3
        WHERE id = $4
        "#,
    )
    .bind(datetime_to_millis(run_at))
    .bind(error)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Promote delayed jobs whose backoff has elapsed
pub async fn promote_due_delayed(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET state = 'waiting', run_at = NULL, updated_at = $1
        WHERE state = 'delayed' AND run_at <= $1
        "#,
    )
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

// =============================================================================
// Dependency graph
// =============================================================================

/// Record one completed child on its parent.
/// Returns the remaining count, or None if the parent no longer waits.
pub async fn decrement_pending_children(
    pool: &SqlitePool,
    parent_id: i64,
) -> Result<Option<i64>, sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    let remaining: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE jobs
        SET pending_children = pending_children - 1, updated_at = $1
        WHERE id = $2 AND state = 'waiting-children'
        RETURNING pending_children
        "#,
    )
    .bind(now)
    .bind(parent_id)
    .fetch_optional(pool)
    .await?;

    Ok(remaining)
}

/// Promote a parent whose last child completed
pub async fn promote_waiting_children(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET state = 'waiting', updated_at = $1
        WHERE id = $2 AND state = 'waiting-children' AND pending_children <= 0
        "#,
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fail a parent still waiting on children (first terminal child failure wins)
pub async fn fail_waiting_parent(
    pool: &SqlitePool,
    parent_id: i64,
    error: &str,
) -> Result<bool, sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET state = 'failed', error = $1, finished_at = $2, updated_at = $2
        WHERE id = $3 AND state = 'waiting-children'
        "#,
    )
    .bind(error)
    .bind(now)
    .bind(parent_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Jobs gated on the given job
pub async fn list_dependents(pool: &SqlitePool, id: i64) -> Result<Vec<Job>, sqlx::Error> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE depends_on_id = $1 AND state = 'waiting-parent'"
    ))
    .bind(id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Job::try_from).collect()
}

/// Unlock one dependent after its dependency completed
pub async fn promote_dependent(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET state = 'waiting', updated_at = $1
        WHERE id = $2 AND state = 'waiting-parent'
        "#,
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Children created together with the given parent
pub async fn list_children(pool: &SqlitePool, parent_id: i64) -> Result<Vec<Job>, sqlx::Error> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE parent_id = $1 ORDER BY id ASC"
    ))
    .bind(parent_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Job::try_from).collect()
}

// =============================================================================
// Maintenance scans
// =============================================================================

/// Remote claims whose last heartbeat is older than the cutoff
pub async fn list_stalled(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Job>, sqlx::Error> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        r#"
        SELECT {JOB_COLUMNS}
        FROM jobs
        WHERE state = 'active'
          AND type IN ({})
          AND updated_at < $1
        "#,
        type_list(&JobType::REMOTE)
    ))
    .bind(datetime_to_millis(cutoff))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Job::try_from).collect()
}

/// Requeue local jobs left `active` by a previous process (startup recovery)
pub async fn requeue_interrupted(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    let result = sqlx::query(&format!(
        r#"
        UPDATE jobs
        SET state = 'waiting', started_at = NULL, updated_at = $1
        WHERE state = 'active' AND type IN ({})
        "#,
        type_list(&JobType::LOCAL)
    ))
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Delete terminal jobs finished before the cutoff
pub async fn delete_finished_before(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM jobs
        WHERE state IN ('completed', 'failed', 'parent-errored', 'cancelled')
          AND finished_at IS NOT NULL
          AND finished_at < $1
        "#,
    )
    .bind(datetime_to_millis(cutoff))
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

// =============================================================================
// Per-type pause
// =============================================================================

pub async fn pause_type(pool: &SqlitePool, job_type: JobType) -> Result<(), sqlx::Error> {
    let now = datetime_to_millis(Utc::now());

    sqlx::query("INSERT OR IGNORE INTO paused_job_types (type, paused_at) VALUES ($1, $2)")
        .bind(job_type.as_str())
        .bind(now)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn resume_type(pool: &SqlitePool, job_type: JobType) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM paused_job_types WHERE type = $1")
        .bind(job_type.as_str())
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn list_paused_types(pool: &SqlitePool) -> Result<Vec<JobType>, sqlx::Error> {
    let rows: Vec<String> = sqlx::query_scalar("SELECT type FROM paused_job_types ORDER BY type")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().filter_map(|s| JobType::from_str(s)).collect())
}

// =============================================================================
// Admin listing
// =============================================================================

pub async fn list_for_admin(
    pool: &SqlitePool,
    state: Option<JobState>,
    job_type: Option<JobType>,
    start: i64,
    count: i64,
) -> Result<Vec<Job>, sqlx::Error> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        r#"
        SELECT {JOB_COLUMNS}
        FROM jobs
        WHERE ($1 IS NULL OR state = $1)
          AND ($2 IS NULL OR type = $2)
        ORDER BY created_at DESC, id DESC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(state.map(JobState::as_str))
    .bind(job_type.map(JobType::as_str))
    .bind(count)
    .bind(start)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Job::try_from).collect()
}

pub async fn count_for_admin(
    pool: &SqlitePool,
    state: Option<JobState>,
    job_type: Option<JobType>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM jobs
        WHERE ($1 IS NULL OR state = $1)
          AND ($2 IS NULL OR type = $2)
        "#,
    )
    .bind(state.map(JobState::as_str))
    .bind(job_type.map(JobType::as_str))
    .fetch_one(pool)
    .await
}

/// Admin listing restricted to runner-visible (remote) types
pub async fn list_runner_jobs_for_admin(
    pool: &SqlitePool,
    state: Option<JobState>,
    job_type: Option<JobType>,
    start: i64,
    count: i64,
) -> Result<Vec<Job>, sqlx::Error> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        r#"
        SELECT {JOB_COLUMNS}
        FROM jobs
        WHERE type IN ({})
          AND ($1 IS NULL OR state = $1)
          AND ($2 IS NULL OR type = $2)
        ORDER BY created_at DESC, id DESC
        LIMIT $3 OFFSET $4
        "#,
        type_list(&JobType::REMOTE)
    ))
    .bind(state.map(JobState::as_str))
    .bind(job_type.map(JobType::as_str))
    .bind(count)
    .bind(start)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Job::try_from).collect()
}

pub async fn count_runner_jobs_for_admin(
    pool: &SqlitePool,
    state: Option<JobState>,
    job_type: Option<JobType>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(&format!(
        r#"
        SELECT COUNT(*)
        FROM jobs
        WHERE type IN ({})
          AND ($1 IS NULL OR state = $1)
          AND ($2 IS NULL OR type = $2)
        "#,
        type_list(&JobType::REMOTE)
    ))
    .bind(state.map(JobState::as_str))
    .bind(job_type.map(JobType::as_str))
    .fetch_one(pool)
    .await
}

// =============================================================================
// Helper Functions
// =============================================================================

fn type_list(types: &[JobType]) -> String {
    types
        .iter()
        .map(|t| format!("'{}'", t.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn encode_err(err: serde_json::Error) -> sqlx::Error {
    sqlx::Error::Encode(Box::new(err))
}

fn decode_err(err: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: i64,
    uuid: String,
    #[sqlx(rename = "type")]
    job_type: String,
    state: String,
    priority: i64,
    payload: String,
    private_payload: Option<String>,
    attempts: i64,
    max_attempts: i64,
    failures: i64,
    parent_id: Option<i64>,
    pending_children: i64,
    depends_on_id: Option<i64>,
    runner_id: Option<i64>,
    processing_job_token: Option<String>,
    progress: Option<i64>,
    error: Option<String>,
    run_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
    started_at: Option<i64>,
    finished_at: Option<i64>,
}

impl TryFrom<JobRow> for Job {
    type Error = sqlx::Error;

    fn try_from(row: JobRow) -> Result<Job, sqlx::Error> {
        let uuid = Uuid::parse_str(&row.uuid).map_err(decode_err)?;

        let state = JobState::from_str(&row.state).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown job state '{}'", row.state).into())
        })?;

        let payload: JobPayload = serde_json::from_str(&row.payload).map_err(decode_err)?;

        let private_payload: Option<JobPrivatePayload> = row
            .private_payload
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(decode_err)?;

        Ok(Job {
            id: row.id,
            uuid,
            state,
            payload,
            private_payload,
            priority: row.priority as i32,
            attempts: row.attempts as u32,
            max_attempts: row.max_attempts as u32,
            failures: row.failures as u32,
            parent_id: row.parent_id,
            pending_children: row.pending_children.max(0) as u32,
            depends_on_id: row.depends_on_id,
            runner_id: row.runner_id,
            processing_job_token: row.processing_job_token,
            progress: row.progress.map(|p| p.clamp(0, 100) as u8),
            error: row.error,
            run_at: row.run_at.map(millis_to_datetime),
            created_at: millis_to_datetime(row.created_at),
            updated_at: millis_to_datetime(row.updated_at),
            started_at: row.started_at.map(millis_to_datetime),
            finished_at: row.finished_at.map(millis_to_datetime),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use reel_core::domain::payload::WebVideoTranscodingPayload;

    fn web_video_payload(resolution: u32) -> JobPayload {
        JobPayload::WebVideoTranscoding(WebVideoTranscodingPayload {
            video_uuid: Uuid::new_v4(),
            resolution,
            input_file_url: "/api/v1/runners/jobs/x/files/input".to_string(),
        })
    }

    #[tokio::test]
    async fn test_create_and_find_round_trip() {
        let pool = test_pool().await;

        let job = create(&pool, NewJob::new(web_video_payload(720)))
            .await
            .unwrap();

        let found = find_by_uuid(&pool, job.uuid).await.unwrap().unwrap();

        assert_eq!(found.id, job.id);
        assert_eq!(found.state, JobState::Waiting);
        assert_eq!(found.job_type(), JobType::WebVideoTranscoding);
        assert_eq!(found.max_attempts, JobType::WebVideoTranscoding.max_attempts());
    }

    #[tokio::test]
    async fn test_claimable_ordering_and_pause() {
        let pool = test_pool().await;

        let mut low = NewJob::new(web_video_payload(480));
        low.priority = 10;
        let mut high = NewJob::new(web_video_payload(1080));
        high.priority = 1;

        let low = create(&pool, low).await.unwrap();
        let high = create(&pool, high).await.unwrap();

        let jobs = list_claimable(&pool, 10).await.unwrap();
        assert_eq!(
            jobs.iter().map(|j| j.id).collect::<Vec<_>>(),
            vec![high.id, low.id]
        );

        pause_type(&pool, JobType::WebVideoTranscoding).await.unwrap();
        assert!(list_claimable(&pool, 10).await.unwrap().is_empty());

        resume_type(&pool, JobType::WebVideoTranscoding).await.unwrap();
        assert_eq!(list_claimable(&pool, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_claim_for_runner_is_exclusive() {
        let pool = test_pool().await;
        let job = create(&pool, NewJob::new(web_video_payload(720)))
            .await
            .unwrap();

        let first = claim_for_runner(&pool, job.id, 1, "rjt-a").await.unwrap();
        let second = claim_for_runner(&pool, job.id, 2, "rjt-b").await.unwrap();

        let claimed = first.expect("first claim should win");
        assert_eq!(claimed.state, JobState::Active);
        assert_eq!(claimed.processing_job_token.as_deref(), Some("rjt-a"));
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_heartbeat_rejects_stale_token() {
        let pool = test_pool().await;
        let job = create(&pool, NewJob::new(web_video_payload(720)))
            .await
            .unwrap();

        claim_for_runner(&pool, job.id, 1, "rjt-live").await.unwrap();

        assert!(heartbeat(&pool, job.id, "rjt-live", Some(50)).await.unwrap());
        assert!(!heartbeat(&pool, job.id, "rjt-stale", Some(99)).await.unwrap());

        let found = find_by_id(&pool, job.id).await.unwrap().unwrap();
        assert_eq!(found.progress, Some(50));
    }

    #[tokio::test]
    async fn test_requeue_stalled_checks_token() {
        let pool = test_pool().await;
        let job = create(&pool, NewJob::new(web_video_payload(720)))
            .await
            .unwrap();

        claim_for_runner(&pool, job.id, 1, "rjt-a").await.unwrap();

        assert!(!requeue_stalled(&pool, job.id, "rjt-other").await.unwrap());
        assert!(requeue_stalled(&pool, job.id, "rjt-a").await.unwrap());

        let found = find_by_id(&pool, job.id).await.unwrap().unwrap();
        assert_eq!(found.state, JobState::Waiting);
        assert!(found.processing_job_token.is_none());
        assert!(found.runner_id.is_none());
    }
}
