//! Typed job payloads
//!
//! One variant per job type so handler dispatch is an exhaustive match.
//! The serialized form is adjacently tagged (`{"type": ..., "payload": ...}`)
//! and the tag values line up with `JobType::as_str`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::JobType;

/// Runner-visible job payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum JobPayload {
    TranscodingBuilder(TranscodingBuilderPayload),
    WebVideoTranscoding(WebVideoTranscodingPayload),
    HlsTranscoding(HlsTranscodingPayload),
    VideoTranscription(VideoTranscriptionPayload),
}

impl JobPayload {
    pub fn job_type(&self) -> JobType {
        match self {
            JobPayload::TranscodingBuilder(_) => JobType::TranscodingBuilder,
            JobPayload::WebVideoTranscoding(_) => JobType::WebVideoTranscoding,
            JobPayload::HlsTranscoding(_) => JobType::HlsTranscoding,
            JobPayload::VideoTranscription(_) => JobType::VideoTranscription,
        }
    }
}

/// Payload of the local job that fans a video out into transcoding jobs.
///
/// Never sent to runners, so it may carry disk paths directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodingBuilderPayload {
    pub video_uuid: Uuid,
    pub input_path: String,
    /// Target resolutions (vertical pixel counts), e.g. `[1080, 720, 480]`.
    pub resolutions: Vec<u32>,
    pub generate_transcription: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebVideoTranscodingPayload {
    pub video_uuid: Uuid,
    pub resolution: u32,
    /// Claim-scoped URL the runner downloads the source file from.
    pub input_file_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HlsTranscodingPayload {
    pub video_uuid: Uuid,
    pub resolution: u32,
    pub input_file_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoTranscriptionPayload {
    pub video_uuid: Uuid,
    pub input_file_url: String,
}

/// Server-only companion to `JobPayload`.
///
/// Holds what the server needs to serve the source file and to move results
/// into place, keyed off the same job row but never serialized to runners.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum JobPrivatePayload {
    WebVideoTranscoding {
        input_path: String,
        output_path: String,
    },
    HlsTranscoding {
        input_path: String,
        output_path: String,
        playlist_path: String,
    },
    VideoTranscription {
        input_path: String,
        output_path: String,
    },
}

impl JobPrivatePayload {
    pub fn input_path(&self) -> &str {
        match self {
            JobPrivatePayload::WebVideoTranscoding { input_path, .. } => input_path,
            JobPrivatePayload::HlsTranscoding { input_path, .. } => input_path,
            JobPrivatePayload::VideoTranscription { input_path, .. } => input_path,
        }
    }
}
