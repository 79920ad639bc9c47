//! Scheduler layer
//!
//! Background loops driving the queue: per-type local workers, the
//! delayed-job promoter, the stale-claim reaper and the terminal-job
//! sweeper. Every loop is interval-driven and survives individual cycle
//! errors.

pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reel_core::domain::job::JobType;
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::ServerConfig;
use crate::repository::job_repository;
use crate::service::notifier::JobNotifier;
use crate::service::runner_job as runner_job_service;
use worker::TypeWorker;

const SWEEPER_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Spawn every scheduler loop. The handles run for the lifetime of the
/// process.
pub fn start(
    pool: SqlitePool,
    notifier: Arc<JobNotifier>,
    config: Arc<ServerConfig>,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    for job_type in JobType::LOCAL {
        let worker = TypeWorker::new(
            job_type,
            pool.clone(),
            Arc::clone(&notifier),
            Arc::clone(&config),
        );

        handles.push(tokio::spawn(async move { worker.run().await }));
    }

    handles.push(spawn_delayed_promoter(pool.clone(), Arc::clone(&config)));
    handles.push(spawn_stale_claim_reaper(
        pool.clone(),
        Arc::clone(&notifier),
        Arc::clone(&config),
    ));
    handles.push(spawn_terminal_sweeper(pool, config));

    handles
}

/// Move `delayed` jobs whose backoff elapsed back to `waiting`
fn spawn_delayed_promoter(pool: SqlitePool, config: Arc<ServerConfig>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(config.worker_tick);

        loop {
            interval.tick().await;

            match job_repository::promote_due_delayed(&pool).await {
                Ok(promoted) if promoted > 0 => {
                    tracing::debug!("Promoted {} delayed job(s)", promoted);
                }
                Ok(_) => {}
                Err(err) => tracing::error!("Delayed job promotion failed: {}", err),
            }
        }
    })
}

/// Requeue remote claims whose holder stopped heartbeating
fn spawn_stale_claim_reaper(
    pool: SqlitePool,
    notifier: Arc<JobNotifier>,
    config: Arc<ServerConfig>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let scan_interval = (config.stalled_job_ttl / 2).max(Duration::from_secs(1));
        let mut interval = time::interval(scan_interval);

        loop {
            interval.tick().await;

            match runner_job_service::requeue_stalled_jobs(
                &pool,
                &notifier,
                config.stalled_job_ttl,
            )
            .await
            {
                Ok(requeued) if requeued > 0 => {
                    tracing::warn!("Reaper requeued {} stalled job(s)", requeued);
                }
                Ok(_) => {}
                Err(err) => tracing::error!("Stale claim scan failed: {}", err),
            }
        }
    })
}

/// Delete terminal jobs past the retention window
fn spawn_terminal_sweeper(pool: SqlitePool, config: Arc<ServerConfig>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(SWEEPER_INTERVAL);

        loop {
            interval.tick().await;

            let retention = chrono::Duration::from_std(config.job_retention)
                .unwrap_or_else(|_| chrono::Duration::zero());
            let cutoff = Utc::now() - retention;

            match job_repository::delete_finished_before(&pool, cutoff).await {
                Ok(deleted) if deleted > 0 => {
                    tracing::info!("Swept {} finished job(s)", deleted);
                }
                Ok(_) => {}
                Err(err) => tracing::error!("Terminal job sweep failed: {}", err),
            }
        }
    })
}
