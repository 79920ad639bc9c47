//! Job domain types

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::payload::{JobPayload, JobPrivatePayload};

/// A unit of deferred work in the durable queue.
///
/// There is a single persisted job record per unit of work; remote runners see
/// a projection of it (see `dto::runner_job`) while local workers consume it
/// directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub uuid: Uuid,
    pub state: JobState,
    pub payload: JobPayload,
    /// Server-only data (internal ids, disk paths). Never serialized out.
    #[serde(skip_serializing, default)]
    pub private_payload: Option<JobPrivatePayload>,
    /// Lower value means dequeued first.
    pub priority: i32,
    /// Local processing attempts consumed so far.
    pub attempts: u32,
    pub max_attempts: u32,
    /// Explicit `error()` reports from remote runners.
    pub failures: u32,
    /// Set on children created together with a parent job.
    pub parent_id: Option<i64>,
    /// How many children still have to complete before this job leaves
    /// `waiting-children`.
    pub pending_children: u32,
    /// This job stays in `waiting-parent` until the referenced job completes.
    pub depends_on_id: Option<i64>,
    pub runner_id: Option<i64>,
    /// Secret proving ownership of the current processing attempt.
    /// Present exactly while the job is `active`.
    pub processing_job_token: Option<String>,
    pub progress: Option<u8>,
    pub error: Option<String>,
    /// For `delayed` jobs, when the job becomes runnable again.
    pub run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn job_type(&self) -> JobType {
        self.payload.job_type()
    }
}

/// Persisted job state
///
/// Superset of the local-queue view (waiting, waiting-children, active,
/// completed, failed, delayed) and the runner-facing projection
/// (waiting-for-parent-job, pending, processing, errored, parent-errored,
/// cancelled). See `dto::runner_job::RunnerJobState` for the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobState {
    Waiting,
    WaitingChildren,
    WaitingParent,
    Delayed,
    Active,
    Completed,
    Failed,
    ParentErrored,
    Cancelled,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::WaitingChildren => "waiting-children",
            JobState::WaitingParent => "waiting-parent",
            JobState::Delayed => "delayed",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::ParentErrored => "parent-errored",
            JobState::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<JobState> {
        match s {
            "waiting" => Some(JobState::Waiting),
            "waiting-children" => Some(JobState::WaitingChildren),
            "waiting-parent" => Some(JobState::WaitingParent),
            "delayed" => Some(JobState::Delayed),
            "active" => Some(JobState::Active),
            "completed" => Some(JobState::Completed),
            "failed" => Some(JobState::Failed),
            "parent-errored" => Some(JobState::ParentErrored),
            "cancelled" => Some(JobState::Cancelled),
            _ => None,
        }
    }

    /// Terminal states are never left again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::ParentErrored | JobState::Cancelled
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job type
///
/// Each type carries its own payload variant in `JobPayload`; dispatch is an
/// exhaustive match so a job type without a handler does not compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    TranscodingBuilder,
    WebVideoTranscoding,
    HlsTranscoding,
    VideoTranscription,
}

impl JobType {
    /// Types processed by in-process workers.
    pub const LOCAL: [JobType; 1] = [JobType::TranscodingBuilder];

    /// Types offered to remote runners.
    pub const REMOTE: [JobType; 3] = [
        JobType::WebVideoTranscoding,
        JobType::HlsTranscoding,
        JobType::VideoTranscription,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobType::TranscodingBuilder => "transcoding-builder",
            JobType::WebVideoTranscoding => "web-video-transcoding",
            JobType::HlsTranscoding => "hls-transcoding",
            JobType::VideoTranscription => "video-transcription",
        }
    }

    pub fn from_str(s: &str) -> Option<JobType> {
        match s {
            "transcoding-builder" => Some(JobType::TranscodingBuilder),
            "web-video-transcoding" => Some(JobType::WebVideoTranscoding),
            "hls-transcoding" => Some(JobType::HlsTranscoding),
            "video-transcription" => Some(JobType::VideoTranscription),
            _ => None,
        }
    }

    pub fn is_remote(self) -> bool {
        !matches!(self, JobType::TranscodingBuilder)
    }

    /// Local retry budget. Remote types use the runner failure budget instead.
    pub fn max_attempts(self) -> u32 {
        match self {
            JobType::TranscodingBuilder => 3,
            _ => 1,
        }
    }

    /// How many jobs of this type may run in-process at the same time.
    pub fn local_concurrency(self) -> usize {
        match self {
            JobType::TranscodingBuilder => 1,
            _ => 0,
        }
    }

    /// Delay before local attempt `attempt + 1`.
    pub fn backoff(self, attempt: u32) -> Duration {
        let base = Duration::from_secs(60);

        match self {
            JobType::TranscodingBuilder => base * 2u32.saturating_pow(attempt.saturating_sub(1)),
            _ => base,
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
