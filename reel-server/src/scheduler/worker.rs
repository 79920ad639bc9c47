//! Local job worker
//!
//! One worker per locally processed job type. Each poll cycle claims as many
//! waiting jobs as the type's concurrency bound allows and runs them in their
//! own tasks; a handler error consumes one attempt and reschedules with
//! backoff.

use std::sync::Arc;

use reel_core::domain::job::{Job, JobType};
use sqlx::SqlitePool;
use tokio::sync::Semaphore;
use tokio::time;

use crate::config::ServerConfig;
use crate::handlers::{self, HandlerContext};
use crate::repository::job_repository;
use crate::service::job as job_service;
use crate::service::notifier::JobNotifier;

/// Worker loop for one job type
pub struct TypeWorker {
    job_type: JobType,
    pool: SqlitePool,
    notifier: Arc<JobNotifier>,
    config: Arc<ServerConfig>,
    semaphore: Arc<Semaphore>,
}

impl TypeWorker {
    pub fn new(
        job_type: JobType,
        pool: SqlitePool,
        notifier: Arc<JobNotifier>,
        config: Arc<ServerConfig>,
    ) -> TypeWorker {
        let semaphore = Arc::new(Semaphore::new(job_type.local_concurrency().max(1)));

        TypeWorker {
            job_type,
            pool,
            notifier,
            config,
            semaphore,
        }
    }

    /// Runs the polling loop forever
    pub async fn run(&self) {
        tracing::info!(
            "Starting {} worker (concurrency {})",
            self.job_type,
            self.job_type.local_concurrency().max(1)
        );

        let mut interval = time::interval(self.config.worker_tick);

        loop {
            interval.tick().await;

            match self.poll_once().await {
                Ok(processed) if processed > 0 => {
                    tracing::debug!("{} worker processed {} job(s)", self.job_type, processed);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::error!("{} worker poll cycle failed: {}", self.job_type, err);
                }
            }
        }
    }

    /// Performs a single poll cycle and waits for the jobs it spawned
    pub async fn poll_once(&self) -> Result<usize, sqlx::Error> {
        let free = self.semaphore.available_permits();
        if free == 0 {
            return Ok(0);
        }

        let candidates =
            job_repository::list_waiting_by_type(&self.pool, self.job_type, free as i64).await?;

        let mut handles = Vec::new();

        for candidate in candidates {
            let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() else {
                break;
            };

            // Somebody else may have taken the job since the listing
            let Some(job) = job_repository::claim_for_worker(&self.pool, candidate.id).await?
            else {
                continue;
            };

            handles.push(self.spawn_job_task(job, permit));
        }

        let processed = handles.len();

        for handle in handles {
            if let Err(err) = handle.await {
                tracing::warn!("{} job task panicked: {}", self.job_type, err);
            }
        }

        Ok(processed)
    }

    /// Runs one claimed job to a terminal or retry transition
    fn spawn_job_task(
        &self,
        job: Job,
        _permit: tokio::sync::OwnedSemaphorePermit,
    ) -> tokio::task::JoinHandle<()> {
        let pool = self.pool.clone();
        let notifier = Arc::clone(&self.notifier);
        let config = Arc::clone(&self.config);

        tokio::spawn(async move {
            let ctx = HandlerContext {
                pool: &pool,
                notifier: &notifier,
                config: &config,
            };

            let outcome = handlers::dispatch(&ctx, &job).await;

            let result = match outcome {
                Ok(()) => job_service::complete_job(&pool, &notifier, &job).await,
                Err(err) => {
                    job_service::retry_or_fail(&pool, &notifier, &job, &format!("{:#}", err)).await
                }
            };

            if let Err(err) = result {
                tracing::error!("Cannot finalize job {}: {}", job.uuid, err);
            }
            // Permit is automatically released when dropped
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::repository::{registration_token_repository, runner_repository};
    use crate::service::job::{ChildJob, CreateJobOptions};
    use crate::service::runner_job as runner_job_service;
    use crate::service::transient_file;
    use reel_core::domain::job::JobState;
    use reel_core::domain::payload::{
        JobPayload, TranscodingBuilderPayload, WebVideoTranscodingPayload,
    };
    use reel_core::domain::runner::Runner;
    use reel_core::dto::runner_job::RunnerJobSuccessPayload;
    use std::time::Duration;
    use uuid::Uuid;

    async fn test_runner(pool: &SqlitePool) -> Runner {
        let token = registration_token_repository::create(pool, "rrt-test")
            .await
            .unwrap();

        runner_repository::create(pool, "encoder-1", None, "rt-test", token.id)
            .await
            .unwrap()
    }

    fn web_video_child(priority: i32) -> ChildJob {
        let uuid = Uuid::new_v4();

        ChildJob {
            payload: JobPayload::WebVideoTranscoding(WebVideoTranscodingPayload {
                video_uuid: Uuid::new_v4(),
                resolution: 720,
                input_file_url: transient_file::input_file_url(uuid),
            }),
            private_payload: None,
            priority,
            depends_on_sibling: None,
        }
    }

    /// Full builder flow: two transcoding children claimed and completed by
    /// a runner, the parent builder then runs locally, and a job depending
    /// on the parent only becomes claimable afterwards.
    #[tokio::test]
    async fn test_parent_child_flow_end_to_end() {
        let pool = test_pool().await;
        let notifier = Arc::new(JobNotifier::new(Duration::from_millis(1)));
        let config = Arc::new(ServerConfig {
            file_root: std::env::temp_dir().join(format!("reel-e2e-{}", Uuid::new_v4())),
            ..ServerConfig::default()
        });
        let runner = test_runner(&pool).await;

        let parent = job_service::create_job_with_children(
            &pool,
            &notifier,
            JobPayload::TranscodingBuilder(TranscodingBuilderPayload {
                video_uuid: Uuid::new_v4(),
                input_path: "/data/source.mp4".to_string(),
                resolutions: vec![480],
                generate_transcription: false,
            }),
            None,
            vec![web_video_child(1), web_video_child(2)],
        )
        .await
        .unwrap();

        // A follow-up job gated on the parent builder
        let follow_up = job_service::create_job(
            &pool,
            &notifier,
            web_video_child(0).payload,
            None,
            CreateJobOptions {
                depends_on: Some(parent.uuid),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(follow_up.state, JobState::WaitingParent);

        // Both children are claimable, ordered by priority
        let available =
            runner_job_service::request_jobs(&pool, &runner, &[JobType::WebVideoTranscoding])
                .await
                .unwrap();
        assert_eq!(
            available.iter().map(|j| j.priority).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(!available.iter().any(|j| j.uuid == follow_up.uuid));

        // The runner processes both children
        for job in &available {
            let accepted = runner_job_service::accept_job(&pool, &runner, job.uuid)
                .await
                .unwrap();

            runner_job_service::success_job(
                &pool,
                &notifier,
                &runner,
                job.uuid,
                &accepted.job_token,
                RunnerJobSuccessPayload::WebVideoTranscoding {
                    video_file: "/tmp/none.mp4".to_string(),
                },
            )
            .await
            .unwrap();
        }

        // Parent left waiting-children and is runnable now
        let parent_now = job_service::get_job(&pool, parent.uuid).await.unwrap();
        assert_eq!(parent_now.state, JobState::Waiting);

        // Still hidden: the parent has not completed yet
        let follow_up_now = job_service::get_job(&pool, follow_up.uuid).await.unwrap();
        assert_eq!(follow_up_now.state, JobState::WaitingParent);

        // The local worker picks the builder up and completes it
        let worker = TypeWorker::new(
            JobType::TranscodingBuilder,
            pool.clone(),
            Arc::clone(&notifier),
            Arc::clone(&config),
        );
        let processed = worker.poll_once().await.unwrap();
        assert_eq!(processed, 1);

        let parent_now = job_service::get_job(&pool, parent.uuid).await.unwrap();
        assert_eq!(parent_now.state, JobState::Completed);

        // Only now does the follow-up job surface in request()
        let follow_up_now = job_service::get_job(&pool, follow_up.uuid).await.unwrap();
        assert_eq!(follow_up_now.state, JobState::Waiting);

        let available =
            runner_job_service::request_jobs(&pool, &runner, &[JobType::WebVideoTranscoding])
                .await
                .unwrap();
        assert!(available.iter().any(|j| j.uuid == follow_up.uuid));
    }

    /// A handler error consumes one attempt and reschedules with backoff;
    /// the worker loop itself survives.
    #[tokio::test]
    async fn test_handler_error_delays_job() {
        let pool = test_pool().await;
        let notifier = Arc::new(JobNotifier::new(Duration::from_millis(1)));
        let config = Arc::new(ServerConfig::default());

        // Empty resolutions make the builder handler fail
        let job = job_service::create_job(
            &pool,
            &notifier,
            JobPayload::TranscodingBuilder(TranscodingBuilderPayload {
                video_uuid: Uuid::new_v4(),
                input_path: "/data/source.mp4".to_string(),
                resolutions: vec![],
                generate_transcription: false,
            }),
            None,
            CreateJobOptions::default(),
        )
        .await
        .unwrap();

        let worker = TypeWorker::new(
            JobType::TranscodingBuilder,
            pool.clone(),
            Arc::clone(&notifier),
            Arc::clone(&config),
        );

        assert_eq!(worker.poll_once().await.unwrap(), 1);

        let job_now = job_service::get_job(&pool, job.uuid).await.unwrap();
        assert_eq!(job_now.state, JobState::Delayed);
        assert_eq!(job_now.attempts, 1);
        assert!(job_now.error.is_some());

        // Nothing left to claim this cycle
        assert_eq!(worker.poll_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_paused_type_not_dequeued() {
        let pool = test_pool().await;
        let notifier = Arc::new(JobNotifier::new(Duration::from_millis(1)));
        let config = Arc::new(ServerConfig::default());

        job_service::create_job(
            &pool,
            &notifier,
            JobPayload::TranscodingBuilder(TranscodingBuilderPayload {
                video_uuid: Uuid::new_v4(),
                input_path: "/data/source.mp4".to_string(),
                resolutions: vec![720],
                generate_transcription: false,
            }),
            None,
            CreateJobOptions::default(),
        )
        .await
        .unwrap();

        job_service::pause_job_type(&pool, JobType::TranscodingBuilder)
            .await
            .unwrap();

        let worker = TypeWorker::new(
            JobType::TranscodingBuilder,
            pool.clone(),
            Arc::clone(&notifier),
            Arc::clone(&config),
        );
        assert_eq!(worker.poll_once().await.unwrap(), 0);

        job_service::resume_job_type(&pool, JobType::TranscodingBuilder)
            .await
            .unwrap();
        assert_eq!(worker.poll_once().await.unwrap(), 1);
    }
}
