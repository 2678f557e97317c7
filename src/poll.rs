use crate::api::{VideoApi, VideoJob, VideoStatus};
use crate::error::PipelineError;
use crate::logi;
use async_trait::async_trait;
use std::time::Duration;

/// Pause between status checks. Swappable so tests never actually wait.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Poll `video_id` until it reaches a terminal status. Unbounded: there is no
/// timeout, only a fixed `interval` between checks.
pub async fn wait_for_terminal(
    api: &dyn VideoApi,
    video_id: &str,
    interval: Duration,
    sleeper: &dyn Sleeper,
) -> Result<VideoJob, PipelineError> {
    let mut last_status: Option<VideoStatus> = None;
    let mut polls = 0u64;

    loop {
        let job = api.retrieve(video_id).await?;
        polls += 1;
        tracing::debug!(video_id, polls, status = %job.status, progress = ?job.progress, "poll");

        if last_status != Some(job.status) {
            match job.progress {
                Some(p) => logi(format!("{} status: {} ({}%)", video_id, job.status, p)),
                None => logi(format!("{} status: {}", video_id, job.status)),
            }
            last_status = Some(job.status);
        }

        if job.status.is_terminal() {
            return Ok(job);
        }
        sleeper.sleep(interval).await;
    }
}
