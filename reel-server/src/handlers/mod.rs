//! Local job handlers
//!
//! One handler per locally processed job type, dispatched through an
//! exhaustive match: adding a job type without a handler arm does not
//! compile.

pub mod transcoding_builder;

use reel_core::domain::job::Job;
use reel_core::domain::payload::JobPayload;
use sqlx::SqlitePool;

use crate::config::ServerConfig;
use crate::service::notifier::JobNotifier;

/// Everything a handler may need, owned by the caller
pub struct HandlerContext<'a> {
    pub pool: &'a SqlitePool,
    pub notifier: &'a JobNotifier,
    pub config: &'a ServerConfig,
}

/// Process one claimed local job
pub async fn dispatch(ctx: &HandlerContext<'_>, job: &Job) -> anyhow::Result<()> {
    match &job.payload {
        JobPayload::TranscodingBuilder(payload) => {
            transcoding_builder::process(ctx, job, payload).await
        }

        // Remote types never enter the local dequeue path
        JobPayload::WebVideoTranscoding(_)
        | JobPayload::HlsTranscoding(_)
        | JobPayload::VideoTranscription(_) => {
            anyhow::bail!("{} jobs are executed by remote runners", job.job_type())
        }
    }
}
