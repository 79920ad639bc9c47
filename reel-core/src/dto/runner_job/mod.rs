//! Runner job DTOs
//!
//! The runner-facing projection of eligible jobs, plus the request/response
//! bodies of the runner protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::{Job, JobState, JobType};
use crate::domain::payload::JobPayload;

/// Runner-visible job state
///
/// Projection of the persisted `JobState`; local-only states (delayed,
/// waiting-children) have no runner-facing equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunnerJobState {
    WaitingForParentJob,
    Pending,
    Processing,
    Completed,
    Errored,
    ParentErrored,
    Cancelled,
}

impl RunnerJobState {
    pub fn from_job_state(state: JobState) -> Option<RunnerJobState> {
        match state {
            JobState::Waiting => Some(RunnerJobState::Pending),
            JobState::WaitingParent => Some(RunnerJobState::WaitingForParentJob),
            JobState::Active => Some(RunnerJobState::Processing),
            JobState::Completed => Some(RunnerJobState::Completed),
            JobState::Failed => Some(RunnerJobState::Errored),
            JobState::ParentErrored => Some(RunnerJobState::ParentErrored),
            JobState::Cancelled => Some(RunnerJobState::Cancelled),
            JobState::WaitingChildren | JobState::Delayed => None,
        }
    }
}

/// One claimable entry in a `request()` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableRunnerJob {
    pub uuid: Uuid,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub payload: JobPayload,
    pub priority: i32,
}

impl From<Job> for AvailableRunnerJob {
    fn from(job: Job) -> Self {
        AvailableRunnerJob {
            uuid: job.uuid,
            job_type: job.payload.job_type(),
            payload: job.payload,
            priority: job.priority,
        }
    }
}

/// Full runner-facing view of a job, returned on accept and in listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerJobView {
    pub uuid: Uuid,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub state: RunnerJobState,
    pub payload: JobPayload,
    pub priority: i32,
    pub failures: u32,
    pub progress: Option<u8>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunnerJobView {
    /// Builds the projection. Returns `None` for states runners never see.
    pub fn from_job(job: Job) -> Option<RunnerJobView> {
        let state = RunnerJobState::from_job_state(job.state)?;

        Some(RunnerJobView {
            uuid: job.uuid,
            job_type: job.payload.job_type(),
            state,
            payload: job.payload,
            priority: job.priority,
            failures: job.failures,
            progress: job.progress,
            error: job.error,
            created_at: job.created_at,
            updated_at: job.updated_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
        })
    }
}

// =============================================================================
// Runner protocol bodies
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRunnerJobBody {
    pub runner_token: String,
    pub job_types: Vec<JobType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRunnerJobResult {
    pub available_jobs: Vec<AvailableRunnerJob>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptRunnerJobBody {
    pub runner_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptRunnerJobResult {
    pub job: RunnerJobView,
    /// Proof of ownership for update/success/error calls on this claim.
    pub job_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRunnerJobBody {
    pub runner_token: String,
    pub job_token: String,
    #[serde(default)]
    pub progress: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessRunnerJobBody {
    pub runner_token: String,
    pub job_token: String,
    pub payload: RunnerJobSuccessPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRunnerJobBody {
    pub runner_token: String,
    pub job_token: String,
    pub message: String,
}

/// Per-type result payload reported on success
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RunnerJobSuccessPayload {
    WebVideoTranscoding {
        video_file: String,
    },
    HlsTranscoding {
        video_file: String,
        resolution_playlist_file: String,
    },
    VideoTranscription {
        vtt_file: String,
    },
}

// =============================================================================
// Admin listing
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRunnerJobsQuery {
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default, rename = "type")]
    pub job_type: Option<JobType>,
    #[serde(default)]
    pub state: Option<RunnerJobState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRunnerJobsResult {
    pub total: i64,
    pub data: Vec<RunnerJobView>,
}
