//! Ephemeral file access
//!
//! Source files for remote jobs are served through claim-scoped URLs: a
//! fetch must present the live `(runner_token, job_token)` pair of the job
//! the URL belongs to. Releasing the claim (success, error, cancel, reaper
//! requeue) revokes every previously issued URL, since the stored token no
//! longer matches.

use reel_core::domain::job::{Job, JobState};
use reel_core::domain::runner::Runner;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::repository::job_repository;

#[derive(Debug)]
pub enum FileAccessError {
    NotFound(Uuid),
    Forbidden,
    NoInputFile(Uuid),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for FileAccessError {
    fn from(err: sqlx::Error) -> Self {
        FileAccessError::DatabaseError(err)
    }
}

impl std::fmt::Display for FileAccessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileAccessError::NotFound(uuid) => write!(f, "job {} not found", uuid),
            FileAccessError::Forbidden => write!(f, "file access not authorized"),
            FileAccessError::NoInputFile(uuid) => write!(f, "job {} has no input file", uuid),
            FileAccessError::DatabaseError(err) => write!(f, "database error: {}", err),
        }
    }
}

impl std::error::Error for FileAccessError {}

/// URL path a runner downloads a job's source file from
pub fn input_file_url(job_uuid: Uuid) -> String {
    format!("/api/v1/runners/jobs/{}/files/input", job_uuid)
}

/// Validate a file fetch against the job's live claim and resolve the file's
/// disk path.
pub async fn resolve_input_file(
    pool: &SqlitePool,
    job_uuid: Uuid,
    runner: &Runner,
    job_token: &str,
) -> Result<(Job, String), FileAccessError> {
    let job = job_repository::find_by_uuid(pool, job_uuid)
        .await?
        .ok_or(FileAccessError::NotFound(job_uuid))?;

    let claim_is_live = job.state == JobState::Active
        && job.runner_id == Some(runner.id)
        && job.processing_job_token.as_deref() == Some(job_token);

    if !claim_is_live {
        return Err(FileAccessError::Forbidden);
    }

    let input_path = job
        .private_payload
        .as_ref()
        .map(|p| p.input_path().to_string())
        .ok_or(FileAccessError::NoInputFile(job_uuid))?;

    Ok((job, input_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::repository::job_repository::NewJob;
    use crate::repository::runner_repository;
    use crate::repository::registration_token_repository;
    use reel_core::domain::payload::{JobPayload, JobPrivatePayload, WebVideoTranscodingPayload};

    async fn runner(pool: &SqlitePool) -> Runner {
        let token = registration_token_repository::create(pool, "rrt-test")
            .await
            .unwrap();

        runner_repository::create(pool, "encoder-1", None, "rt-test", token.id)
            .await
            .unwrap()
    }

    fn new_job() -> NewJob {
        let uuid = Uuid::new_v4();
        let mut new = NewJob::new(JobPayload::WebVideoTranscoding(WebVideoTranscodingPayload {
            video_uuid: Uuid::new_v4(),
            resolution: 720,
            input_file_url: input_file_url(uuid),
        }));
        new.uuid = uuid;
        new.private_payload = Some(JobPrivatePayload::WebVideoTranscoding {
            input_path: "/data/source.mp4".to_string(),
            output_path: "/data/out.mp4".to_string(),
        });
        new
    }

    #[tokio::test]
    async fn test_access_follows_claim_lifetime() {
        let pool = test_pool().await;
        let runner = runner(&pool).await;

        let job = job_repository::create(&pool, new_job()).await.unwrap();

        // No claim yet
        assert!(matches!(
            resolve_input_file(&pool, job.uuid, &runner, "rjt-a").await,
            Err(FileAccessError::Forbidden)
        ));

        job_repository::claim_for_runner(&pool, job.id, runner.id, "rjt-a")
            .await
            .unwrap();

        let (_, path) = resolve_input_file(&pool, job.uuid, &runner, "rjt-a")
            .await
            .unwrap();
        assert_eq!(path, "/data/source.mp4");

        // Wrong token never authorizes
        assert!(matches!(
            resolve_input_file(&pool, job.uuid, &runner, "rjt-b").await,
            Err(FileAccessError::Forbidden)
        ));

        // Completing releases the claim and revokes the URL
        job_repository::complete(&pool, job.id).await.unwrap();
        assert!(matches!(
            resolve_input_file(&pool, job.uuid, &runner, "rjt-a").await,
            Err(FileAccessError::Forbidden)
        ));
    }
}
