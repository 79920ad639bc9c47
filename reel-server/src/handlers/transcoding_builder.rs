//! Transcoding builder handler
//!
//! Fans a freshly uploaded video out into runner jobs: one web video encode
//! at the highest requested resolution, an HLS rendition per resolution
//! gated on the web video job, and optionally a transcription job.

use reel_core::domain::job::Job;
use reel_core::domain::payload::{
    HlsTranscodingPayload, JobPayload, JobPrivatePayload, TranscodingBuilderPayload,
    VideoTranscriptionPayload, WebVideoTranscodingPayload,
};
use uuid::Uuid;

use crate::handlers::HandlerContext;
use crate::service::job::{self as job_service, CreateJobOptions};
use crate::service::transient_file;

pub async fn process(
    ctx: &HandlerContext<'_>,
    job: &Job,
    payload: &TranscodingBuilderPayload,
) -> anyhow::Result<()> {
    let Some(&max_resolution) = payload.resolutions.iter().max() else {
        anyhow::bail!("transcoding builder payload has no resolutions");
    };

    let video_dir = ctx
        .config
        .file_root
        .join("videos")
        .join(payload.video_uuid.to_string());

    // Web video encode first; everything else hangs off its output
    let web_uuid = Uuid::new_v4();
    let web_job = job_service::create_job(
        ctx.pool,
        ctx.notifier,
        JobPayload::WebVideoTranscoding(WebVideoTranscodingPayload {
            video_uuid: payload.video_uuid,
            resolution: max_resolution,
            input_file_url: transient_file::input_file_url(web_uuid),
        }),
        Some(JobPrivatePayload::WebVideoTranscoding {
            input_path: payload.input_path.clone(),
            output_path: video_dir
                .join(format!("{}.mp4", max_resolution))
                .to_string_lossy()
                .into_owned(),
        }),
        CreateJobOptions {
            uuid: Some(web_uuid),
            priority: job.priority,
            ..Default::default()
        },
    )
    .await?;

    for &resolution in &payload.resolutions {
        let hls_uuid = Uuid::new_v4();

        job_service::create_job(
            ctx.pool,
            ctx.notifier,
            JobPayload::HlsTranscoding(HlsTranscodingPayload {
                video_uuid: payload.video_uuid,
                resolution,
                input_file_url: transient_file::input_file_url(hls_uuid),
            }),
            Some(JobPrivatePayload::HlsTranscoding {
                input_path: payload.input_path.clone(),
                output_path: video_dir
                    .join(format!("{}-fragmented.mp4", resolution))
                    .to_string_lossy()
                    .into_owned(),
                playlist_path: video_dir
                    .join(format!("{}.m3u8", resolution))
                    .to_string_lossy()
                    .into_owned(),
            }),
            CreateJobOptions {
                uuid: Some(hls_uuid),
                priority: job.priority,
                depends_on: Some(web_job.uuid),
                ..Default::default()
            },
        )
        .await?;
    }

    if payload.generate_transcription {
        let transcription_uuid = Uuid::new_v4();

        job_service::create_job(
            ctx.pool,
            ctx.notifier,
            JobPayload::VideoTranscription(VideoTranscriptionPayload {
                video_uuid: payload.video_uuid,
                input_file_url: transient_file::input_file_url(transcription_uuid),
            }),
            Some(JobPrivatePayload::VideoTranscription {
                input_path: payload.input_path.clone(),
                output_path: video_dir.join("captions.vtt").to_string_lossy().into_owned(),
            }),
            CreateJobOptions {
                uuid: Some(transcription_uuid),
                priority: job.priority,
                depends_on: Some(web_job.uuid),
                ..Default::default()
            },
        )
        .await?;
    }

    tracing::info!(
        "Transcoding builder {} created jobs for video {} ({} resolution(s))",
        job.uuid,
        payload.video_uuid,
        payload.resolutions.len()
    );

    Ok(())
}
