//! Runner Job Broker
//!
//! Exposes claimable views of eligible jobs to remote runners and implements
//! the request/accept/update/success/error protocol, plus the stale-claim
//! reaper. Claiming is a single conditional UPDATE, so concurrent accepts
//! resolve to exactly one winner without external locking. Calls carrying a
//! token that no longer matches the live claim are silently discarded: the
//! caller lost the race legitimately.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use reel_core::domain::job::{Job, JobState, JobType};
use reel_core::domain::payload::JobPrivatePayload;
use reel_core::domain::runner::Runner;
use reel_core::dto::runner_job::{
    AcceptRunnerJobResult, AvailableRunnerJob, ListRunnerJobsQuery, ListRunnerJobsResult,
    RunnerJobState, RunnerJobSuccessPayload, RunnerJobView,
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::repository::job_repository;
use crate::service::job::{self as job_service, JobError};
use crate::service::notifier::JobNotifier;

/// How many claimable jobs one `request()` returns at most
const AVAILABLE_JOBS_LIMIT: i64 = 10;

/// Service error type
#[derive(Debug)]
pub enum BrokerError {
    NotFound(Uuid),
    /// Lost an accept race, or the job left `pending` some other way
    NotPending(Uuid),
    InvalidState(String),
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for BrokerError {
    fn from(err: sqlx::Error) -> Self {
        BrokerError::DatabaseError(err)
    }
}

impl std::fmt::Display for BrokerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerError::NotFound(uuid) => write!(f, "job {} not found", uuid),
            BrokerError::NotPending(uuid) => {
                write!(f, "job {} is not in pending state anymore", uuid)
            }
            BrokerError::InvalidState(msg) => write!(f, "invalid job state: {}", msg),
            BrokerError::ValidationError(msg) => write!(f, "validation error: {}", msg),
            BrokerError::DatabaseError(err) => write!(f, "database error: {}", err),
        }
    }
}

impl std::error::Error for BrokerError {}

impl From<JobError> for BrokerError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(uuid) => BrokerError::NotFound(uuid),
            JobError::InvalidState(msg) => BrokerError::InvalidState(msg),
            JobError::ValidationError(msg) => BrokerError::ValidationError(msg),
            JobError::DatabaseError(err) => BrokerError::DatabaseError(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;

/// Jobs the given runner could claim right now, most urgent first
pub async fn request_jobs(
    pool: &SqlitePool,
    runner: &Runner,
    job_types: &[JobType],
) -> Result<Vec<AvailableRunnerJob>> {
    let jobs = job_repository::list_claimable(pool, AVAILABLE_JOBS_LIMIT).await?;

    let available: Vec<AvailableRunnerJob> = jobs
        .into_iter()
        .filter(|job| job_types.contains(&job.job_type()))
        .map(AvailableRunnerJob::from)
        .collect();

    tracing::debug!(
        "Runner {} requested jobs, {} available",
        runner.name,
        available.len()
    );

    Ok(available)
}

/// Atomic check-and-set claim of a pending job.
///
/// Exactly one of any number of concurrent accepts succeeds; the rest get
/// `NotPending`.
pub async fn accept_job(
    pool: &SqlitePool,
    runner: &Runner,
    job_uuid: Uuid,
) -> Result<AcceptRunnerJobResult> {
    let job = job_repository::find_by_uuid(pool, job_uuid)
        .await?
        .ok_or(BrokerError::NotFound(job_uuid))?;

    if !job.job_type().is_remote() {
        return Err(BrokerError::ValidationError(format!(
            "{} jobs cannot be claimed by runners",
            job.job_type()
        )));
    }

    let job_token = generate_job_token();

    let claimed = job_repository::claim_for_runner(pool, job.id, runner.id, &job_token)
        .await?
        .ok_or(BrokerError::NotPending(job_uuid))?;

    tracing::info!(
        "Runner {} accepted job {} ({})",
        runner.name,
        claimed.uuid,
        claimed.job_type()
    );

    let view = RunnerJobView::from_job(claimed).ok_or_else(|| {
        BrokerError::InvalidState(format!("job {} has no runner-facing view", job_uuid))
    })?;

    Ok(AcceptRunnerJobResult {
        job: view,
        job_token,
    })
}

/// Heartbeat + progress from the current claim holder.
/// A stale token makes this a no-op, never an error.
pub async fn update_job(
    pool: &SqlitePool,
    runner: &Runner,
    job_uuid: Uuid,
    job_token: &str,
    progress: Option<u8>,
) -> Result<()> {
    let Some(job) = find_live_claim(pool, job_uuid, runner, job_token).await? else {
        return Ok(());
    };

    job_repository::heartbeat(pool, job.id, job_token, progress).await?;

    tracing::debug!(
        "Runner {} updated job {} (progress {:?})",
        runner.name,
        job.uuid,
        progress
    );

    Ok(())
}

/// Successful completion from the current claim holder.
///
/// Moves produced files into place, completes the job and unlocks anything
/// gated on it. With a stale token this silently does nothing.
pub async fn success_job(
    pool: &SqlitePool,
    notifier: &JobNotifier,
    runner: &Runner,
    job_uuid: Uuid,
    job_token: &str,
    result: RunnerJobSuccessPayload,
) -> Result<()> {
    let Some(job) = find_live_claim(pool, job_uuid, runner, job_token).await? else {
        tracing::debug!(
            "Discarding late success for job {} from runner {}",
            job_uuid,
            runner.name
        );
        return Ok(());
    };

    store_result_files(&job, &result).await?;

    job_service::complete_job(pool, notifier, &job).await?;

    tracing::info!(
        "Runner {} completed job {} ({})",
        runner.name,
        job.uuid,
        job.job_type()
    );

    Ok(())
}

/// Failure report from the current claim holder.
///
/// Below the failure budget the job goes back to the pool, claimable by any
/// runner; at the budget it turns terminal and the failure cascades.
pub async fn error_job(
    pool: &SqlitePool,
    notifier: &JobNotifier,
    runner: &Runner,
    job_uuid: Uuid,
    job_token: &str,
    message: &str,
    max_failures: u32,
) -> Result<()> {
    let Some(job) = find_live_claim(pool, job_uuid, runner, job_token).await? else {
        tracing::debug!(
            "Discarding late error for job {} from runner {}",
            job_uuid,
            runner.name
        );
        return Ok(());
    };

    let failures = job_repository::increment_failures(pool, job.id).await?;

    tracing::error!(
        "Runner {} reported an error on job {} ({}): {} (failure {}/{})",
        runner.name,
        job.uuid,
        job.job_type(),
        message,
        failures,
        max_failures
    );

    if failures >= max_failures {
        job_service::fail_job(pool, notifier, &job, message).await?;
    } else {
        job_repository::release_to_waiting(pool, job.id).await?;
        notifier.notify_pending(job.job_type());
    }

    Ok(())
}

/// Stale-claim reaper: requeue claims whose holder stopped heartbeating.
///
/// The holder is presumed crashed, not faulty, so the failure budget is not
/// charged. Requeueing is conditional on the stored token, which also
/// invalidates it for any late call from the evicted holder.
pub async fn requeue_stalled_jobs(
    pool: &SqlitePool,
    notifier: &JobNotifier,
    ttl: Duration,
) -> Result<u64> {
    let cutoff =
        Utc::now() - chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());

    let mut requeued = 0;

    for job in job_repository::list_stalled(pool, cutoff).await? {
        let Some(token) = job.processing_job_token.as_deref() else {
            continue;
        };

        if job_repository::requeue_stalled(pool, job.id, token).await? {
            tracing::warn!(
                "Requeued stalled job {} ({}), runner {:?} stopped responding",
                job.uuid,
                job.job_type(),
                job.runner_id
            );

            notifier.notify_pending(job.job_type());
            requeued += 1;
        }
    }

    Ok(requeued)
}

/// Admin listing of runner-visible jobs
pub async fn list_runner_jobs(
    pool: &SqlitePool,
    query: ListRunnerJobsQuery,
) -> Result<ListRunnerJobsResult> {
    let state = query.state.map(runner_state_to_job_state);
    let start = query.start.unwrap_or(0).max(0);
    let count = query.count.unwrap_or(20).clamp(1, 100);

    let total =
        job_repository::count_runner_jobs_for_admin(pool, state, query.job_type).await?;
    let jobs =
        job_repository::list_runner_jobs_for_admin(pool, state, query.job_type, start, count)
            .await?;

    Ok(ListRunnerJobsResult {
        total,
        data: jobs.into_iter().filter_map(RunnerJobView::from_job).collect(),
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Resolve a (job, runner, token) triple to the job iff the claim is live.
/// `None` means the caller lost its claim; per protocol that is silent.
async fn find_live_claim(
    pool: &SqlitePool,
    job_uuid: Uuid,
    runner: &Runner,
    job_token: &str,
) -> Result<Option<Job>> {
    let job = job_repository::find_by_uuid(pool, job_uuid)
        .await?
        .ok_or(BrokerError::NotFound(job_uuid))?;

    let live = job.state == JobState::Active
        && job.runner_id == Some(runner.id)
        && job.processing_job_token.as_deref() == Some(job_token);

    Ok(live.then_some(job))
}

fn generate_job_token() -> String {
    format!("rjt-{}", Uuid::new_v4())
}

fn runner_state_to_job_state(state: RunnerJobState) -> JobState {
    match state {
        RunnerJobState::WaitingForParentJob => JobState::WaitingParent,
        RunnerJobState::Pending => JobState::Waiting,
        RunnerJobState::Processing => JobState::Active,
        RunnerJobState::Completed => JobState::Completed,
        RunnerJobState::Errored => JobState::Failed,
        RunnerJobState::ParentErrored => JobState::ParentErrored,
        RunnerJobState::Cancelled => JobState::Cancelled,
    }
}

/// Move files a runner produced to the destinations recorded in the private
/// payload. A missing destination entry means the result type did not match
/// the job type.
async fn store_result_files(job: &Job, result: &RunnerJobSuccessPayload) -> Result<()> {
    let Some(private) = job.private_payload.as_ref() else {
        return Ok(());
    };

    match (private, result) {
        (
            JobPrivatePayload::WebVideoTranscoding { output_path, .. },
            RunnerJobSuccessPayload::WebVideoTranscoding { video_file },
        ) => {
            move_into_place(video_file, output_path).await;
        }
        (
            JobPrivatePayload::HlsTranscoding {
                output_path,
                playlist_path,
                ..
            },
            RunnerJobSuccessPayload::HlsTranscoding {
                video_file,
                resolution_playlist_file,
            },
        ) => {
            move_into_place(video_file, output_path).await;
            move_into_place(resolution_playlist_file, playlist_path).await;
        }
        (
            JobPrivatePayload::VideoTranscription { output_path, .. },
            RunnerJobSuccessPayload::VideoTranscription { vtt_file },
        ) => {
            move_into_place(vtt_file, output_path).await;
        }
        _ => {
            return Err(BrokerError::ValidationError(format!(
                "result payload does not match job type {}",
                job.job_type()
            )));
        }
    }

    Ok(())
}

async fn move_into_place(source: &str, destination: &str) {
    if let Some(parent) = Path::new(destination).parent() {
        if let Err(err) = tokio::fs::create_dir_all(parent).await {
            tracing::warn!("Cannot create directory {}: {}", parent.display(), err);
            return;
        }
    }

    if let Err(err) = tokio::fs::rename(source, destination).await {
        tracing::warn!("Cannot move {} to {}: {}", source, destination, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::repository::{registration_token_repository, runner_repository};
    use crate::service::job::{ChildJob, CreateJobOptions};
    use crate::service::transient_file;
    use reel_core::domain::payload::{
        JobPayload, TranscodingBuilderPayload, VideoTranscriptionPayload,
        WebVideoTranscodingPayload,
    };
    use std::sync::Arc;

    const MAX_FAILURES: u32 = 5;

    fn notifier() -> JobNotifier {
        JobNotifier::new(Duration::from_millis(1))
    }

    async fn runner_named(pool: &SqlitePool, name: &str) -> Runner {
        let secret = format!("rrt-{}", Uuid::new_v4());
        let token = registration_token_repository::create(pool, &secret)
            .await
            .unwrap();

        runner_repository::create(
            pool,
            name,
            None,
            &format!("rt-{}", Uuid::new_v4()),
            token.id,
        )
        .await
        .unwrap()
    }

    fn web_video_payload(resolution: u32) -> JobPayload {
        let uuid = Uuid::new_v4();
        JobPayload::WebVideoTranscoding(WebVideoTranscodingPayload {
            video_uuid: Uuid::new_v4(),
            resolution,
            input_file_url: transient_file::input_file_url(uuid),
        })
    }

    fn transcription_payload() -> JobPayload {
        JobPayload::VideoTranscription(VideoTranscriptionPayload {
            video_uuid: Uuid::new_v4(),
            input_file_url: "/api/v1/runners/jobs/x/files/input".to_string(),
        })
    }

    async fn pending_job(pool: &SqlitePool, notifier: &JobNotifier, priority: i32) -> Job {
        job_service::create_job(
            pool,
            notifier,
            web_video_payload(720),
            None,
            CreateJobOptions {
                priority,
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_concurrent_accepts_have_exactly_one_winner() {
        let pool = test_pool().await;
        let notifier = notifier();
        let job = pending_job(&pool, &notifier, 0).await;

        let runner = Arc::new(runner_named(&pool, "encoder-1").await);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            let runner = Arc::clone(&runner);
            let uuid = job.uuid;
            handles.push(tokio::spawn(async move {
                accept_job(&pool, &runner, uuid).await
            }));
        }

        let mut wins = 0;
        let mut losses = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(result) => {
                    assert_eq!(result.job.state, RunnerJobState::Processing);
                    assert!(result.job_token.starts_with("rjt-"));
                    wins += 1;
                }
                Err(BrokerError::NotPending(_)) => losses += 1,
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(losses, 7);
    }

    #[tokio::test]
    async fn test_request_orders_by_priority_and_filters_types() {
        let pool = test_pool().await;
        let notifier = notifier();
        let runner = runner_named(&pool, "encoder-1").await;

        let low = pending_job(&pool, &notifier, 2).await;
        let high = pending_job(&pool, &notifier, 1).await;
        let transcription = job_service::create_job(
            &pool,
            &notifier,
            transcription_payload(),
            None,
            CreateJobOptions::default(),
        )
        .await
        .unwrap();

        let available = request_jobs(&pool, &runner, &[JobType::WebVideoTranscoding])
            .await
            .unwrap();
        assert_eq!(
            available.iter().map(|j| j.uuid).collect::<Vec<_>>(),
            vec![high.uuid, low.uuid]
        );

        let available = request_jobs(
            &pool,
            &runner,
            &[JobType::WebVideoTranscoding, JobType::VideoTranscription],
        )
        .await
        .unwrap();
        assert_eq!(available.len(), 3);
        assert!(available.iter().any(|j| j.uuid == transcription.uuid));
    }

    #[tokio::test]
    async fn test_error_requeues_until_budget_exhausted() {
        let pool = test_pool().await;
        let notifier = notifier();
        let runner = runner_named(&pool, "encoder-1").await;
        let job = pending_job(&pool, &notifier, 0).await;

        for round in 1..MAX_FAILURES {
            let accepted = accept_job(&pool, &runner, job.uuid).await.unwrap();

            error_job(
                &pool,
                &notifier,
                &runner,
                job.uuid,
                &accepted.job_token,
                "codec exploded",
                MAX_FAILURES,
            )
            .await
            .unwrap();

            // Below the budget the job is claimable again
            let current = job_service::get_job(&pool, job.uuid).await.unwrap();
            assert_eq!(current.state, JobState::Waiting, "round {}", round);
            assert_eq!(current.failures, round);

            let available = request_jobs(&pool, &runner, &[JobType::WebVideoTranscoding])
                .await
                .unwrap();
            assert!(available.iter().any(|j| j.uuid == job.uuid));
        }

        // Final failure crosses the budget: terminal and gone from request()
        let accepted = accept_job(&pool, &runner, job.uuid).await.unwrap();
        error_job(
            &pool,
            &notifier,
            &runner,
            job.uuid,
            &accepted.job_token,
            "codec exploded",
            MAX_FAILURES,
        )
        .await
        .unwrap();

        let current = job_service::get_job(&pool, job.uuid).await.unwrap();
        assert_eq!(current.state, JobState::Failed);

        let available = request_jobs(&pool, &runner, &[JobType::WebVideoTranscoding])
            .await
            .unwrap();
        assert!(available.is_empty());
    }

    #[tokio::test]
    async fn test_stale_token_cannot_overwrite_new_claim() {
        let pool = test_pool().await;
        let notifier = notifier();
        let first = runner_named(&pool, "encoder-1").await;
        let second = runner_named(&pool, "encoder-2").await;
        let job = pending_job(&pool, &notifier, 0).await;

        let stale = accept_job(&pool, &first, job.uuid).await.unwrap();

        // First runner goes dark; with a zero TTL the reaper requeues as soon
        // as the heartbeat stamp is in the past
        tokio::time::sleep(Duration::from_millis(5)).await;
        let requeued = requeue_stalled_jobs(&pool, &notifier, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(requeued, 1);

        // Free retry: the failure budget is untouched
        let current = job_service::get_job(&pool, job.uuid).await.unwrap();
        assert_eq!(current.state, JobState::Waiting);
        assert_eq!(current.failures, 0);

        // A second runner picks it up and finishes it
        let fresh = accept_job(&pool, &second, job.uuid).await.unwrap();
        success_job(
            &pool,
            &notifier,
            &second,
            job.uuid,
            &fresh.job_token,
            RunnerJobSuccessPayload::WebVideoTranscoding {
                video_file: "/tmp/does-not-exist.mp4".to_string(),
            },
        )
        .await
        .unwrap();

        // The evicted holder's late calls are silent no-ops
        success_job(
            &pool,
            &notifier,
            &first,
            job.uuid,
            &stale.job_token,
            RunnerJobSuccessPayload::WebVideoTranscoding {
                video_file: "/tmp/stale.mp4".to_string(),
            },
        )
        .await
        .unwrap();
        error_job(
            &pool,
            &notifier,
            &first,
            job.uuid,
            &stale.job_token,
            "late error",
            MAX_FAILURES,
        )
        .await
        .unwrap();
        update_job(&pool, &first, job.uuid, &stale.job_token, Some(50))
            .await
            .unwrap();

        let current = job_service::get_job(&pool, job.uuid).await.unwrap();
        assert_eq!(current.state, JobState::Completed);
        assert_eq!(current.failures, 0);
    }

    #[tokio::test]
    async fn test_reaper_leaves_live_claims_alone() {
        let pool = test_pool().await;
        let notifier = notifier();
        let runner = runner_named(&pool, "encoder-1").await;
        let job = pending_job(&pool, &notifier, 0).await;

        let accepted = accept_job(&pool, &runner, job.uuid).await.unwrap();

        // Claim heartbeated recently: a sane TTL does not reap it
        let requeued = requeue_stalled_jobs(&pool, &notifier, Duration::from_secs(300))
            .await
            .unwrap();
        assert_eq!(requeued, 0);

        let current = job_service::get_job(&pool, job.uuid).await.unwrap();
        assert_eq!(current.state, JobState::Active);
        assert_eq!(
            current.processing_job_token.as_deref(),
            Some(accepted.job_token.as_str())
        );
    }

    #[tokio::test]
    async fn test_cancel_discards_late_success() {
        let pool = test_pool().await;
        let notifier = notifier();
        let runner = runner_named(&pool, "encoder-1").await;
        let job = pending_job(&pool, &notifier, 0).await;

        let accepted = accept_job(&pool, &runner, job.uuid).await.unwrap();

        job_service::cancel_job(&pool, job.uuid).await.unwrap();

        success_job(
            &pool,
            &notifier,
            &runner,
            job.uuid,
            &accepted.job_token,
            RunnerJobSuccessPayload::WebVideoTranscoding {
                video_file: "/tmp/late.mp4".to_string(),
            },
        )
        .await
        .unwrap();

        let current = job_service::get_job(&pool, job.uuid).await.unwrap();
        assert_eq!(current.state, JobState::Cancelled);
    }

    #[tokio::test]
    async fn test_success_moves_result_file_into_place() {
        let pool = test_pool().await;
        let notifier = notifier();
        let runner = runner_named(&pool, "encoder-1").await;

        let scratch = std::env::temp_dir().join(format!("reel-test-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&scratch).await.unwrap();

        let produced = scratch.join("produced.mp4");
        tokio::fs::write(&produced, b"encoded bytes").await.unwrap();

        let output = scratch.join("videos").join("720.mp4");

        let job = job_service::create_job(
            &pool,
            &notifier,
            web_video_payload(720),
            Some(JobPrivatePayload::WebVideoTranscoding {
                input_path: scratch.join("source.mp4").to_string_lossy().into_owned(),
                output_path: output.to_string_lossy().into_owned(),
            }),
            CreateJobOptions::default(),
        )
        .await
        .unwrap();

        let accepted = accept_job(&pool, &runner, job.uuid).await.unwrap();

        success_job(
            &pool,
            &notifier,
            &runner,
            job.uuid,
            &accepted.job_token,
            RunnerJobSuccessPayload::WebVideoTranscoding {
                video_file: produced.to_string_lossy().into_owned(),
            },
        )
        .await
        .unwrap();

        let moved = tokio::fs::read(&output).await.unwrap();
        assert_eq!(moved, b"encoded bytes");
        assert!(!produced.exists());

        tokio::fs::remove_dir_all(&scratch).await.unwrap();
    }

    #[tokio::test]
    async fn test_mismatched_result_payload_rejected() {
        let pool = test_pool().await;
        let notifier = notifier();
        let runner = runner_named(&pool, "encoder-1").await;

        let job = job_service::create_job(
            &pool,
            &notifier,
            web_video_payload(720),
            Some(JobPrivatePayload::WebVideoTranscoding {
                input_path: "/data/in.mp4".to_string(),
                output_path: "/data/out.mp4".to_string(),
            }),
            CreateJobOptions::default(),
        )
        .await
        .unwrap();

        let accepted = accept_job(&pool, &runner, job.uuid).await.unwrap();

        let result = success_job(
            &pool,
            &notifier,
            &runner,
            job.uuid,
            &accepted.job_token,
            RunnerJobSuccessPayload::VideoTranscription {
                vtt_file: "/tmp/sub.vtt".to_string(),
            },
        )
        .await;

        assert!(matches!(result, Err(BrokerError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_dependent_job_hidden_until_dependency_completes() {
        let pool = test_pool().await;
        let notifier = notifier();
        let runner = runner_named(&pool, "encoder-1").await;

        let parent = create_builder_with_children(&pool, &notifier).await;
        let children = job_repository::list_children(&pool, parent.id).await.unwrap();

        // The HLS child depends on the web video child: only the latter is
        // claimable at first
        let available = request_jobs(
            &pool,
            &runner,
            &[JobType::WebVideoTranscoding, JobType::HlsTranscoding],
        )
        .await
        .unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].job_type, JobType::WebVideoTranscoding);

        let web = &children[0];
        let accepted = accept_job(&pool, &runner, web.uuid).await.unwrap();
        success_job(
            &pool,
            &notifier,
            &runner,
            web.uuid,
            &accepted.job_token,
            RunnerJobSuccessPayload::WebVideoTranscoding {
                video_file: "/tmp/none.mp4".to_string(),
            },
        )
        .await
        .unwrap();

        let available = request_jobs(
            &pool,
            &runner,
            &[JobType::WebVideoTranscoding, JobType::HlsTranscoding],
        )
        .await
        .unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].job_type, JobType::HlsTranscoding);
    }

    async fn create_builder_with_children(pool: &SqlitePool, notifier: &JobNotifier) -> Job {
        use reel_core::domain::payload::HlsTranscodingPayload;

        let builder = JobPayload::TranscodingBuilder(TranscodingBuilderPayload {
            video_uuid: Uuid::new_v4(),
            input_path: "/data/source.mp4".to_string(),
            resolutions: vec![720],
            generate_transcription: false,
        });

        let children = vec![
            ChildJob {
                payload: web_video_payload(720),
                private_payload: None,
                priority: 1,
                depends_on_sibling: None,
            },
            ChildJob {
                payload: JobPayload::HlsTranscoding(HlsTranscodingPayload {
                    video_uuid: Uuid::new_v4(),
                    resolution: 720,
                    input_file_url: "/api/v1/runners/jobs/x/files/input".to_string(),
                }),
                private_payload: None,
                priority: 2,
                depends_on_sibling: Some(0),
            },
        ];

        job_service::create_job_with_children(pool, notifier, builder, None, children)
            .await
            .unwrap()
    }
}
