//! The generation run: every clip is submitted, polled, downloaded and
//! removed from the remote service before the next one starts, then the
//! local files are joined in storyboard order.

use crate::api::{CreateVideo, VideoApi, VideoStatus};
use crate::config::Settings;
use crate::error::PipelineError;
use crate::ffmpeg::Joiner;
use crate::init::ensure_out_dir;
use crate::poll::{Sleeper, wait_for_terminal};
use crate::storyboard::{ClipSpec, Storyboard};
use crate::{logi, logok, logw};
use std::path::PathBuf;

/// Best-effort remote cleanup. Failures are only logged: by the time this
/// runs the clip is either safely on disk or already lost.
async fn delete_remote(api: &dyn VideoApi, video_id: &str) {
    logi(format!("Deleting remote video {} ...", video_id));
    match api.delete(video_id).await {
        Ok(()) => logok("Remote delete complete."),
        Err(err) => logw(format!(
            "Could not delete remote video {}: {}",
            video_id, err
        )),
    }
}

/// Generate one clip and return the path of its downloaded file.
pub async fn run_clip(
    settings: &Settings,
    storyboard: &Storyboard,
    clip: &ClipSpec,
    api: &dyn VideoApi,
    sleeper: &dyn Sleeper,
) -> Result<PathBuf, PipelineError> {
    let request = CreateVideo {
        model: settings.model.clone(),
        prompt: storyboard.prompt_for(clip),
        seconds: clip.seconds,
        size: settings.size.clone(),
    };

    let job = api.create(&request).await?;
    logi(format!("Video ID: {} | polling...", job.id));

    let done = wait_for_terminal(api, &job.id, settings.poll_interval(), sleeper).await?;
    logi(format!("Status: {}", done.status));

    if done.status != VideoStatus::Completed {
        if let Some(msg) = done.error.as_ref().and_then(|e| e.message.as_deref()) {
            logw(format!("{} error: {}", clip.name, msg));
        }
        delete_remote(api, &job.id).await;
        return Err(PipelineError::ClipNotCompleted {
            clip: clip.name.clone(),
            status: done.status,
        });
    }

    let out_file = settings.clip_path(&clip.name);
    logi(format!("Downloading to {} ...", out_file.display()));
    let downloaded = api.download_content(&job.id, &out_file).await;
    if let Ok(bytes) = &downloaded {
        logok(format!("Download complete ({} bytes).", bytes));
    }

    delete_remote(api, &job.id).await;
    downloaded?;

    Ok(out_file)
}

/// Run the whole storyboard and return the path of the joined video.
pub async fn run_pipeline(
    settings: &Settings,
    storyboard: &Storyboard,
    api: &dyn VideoApi,
    sleeper: &dyn Sleeper,
    joiner: &dyn Joiner,
) -> Result<PathBuf, PipelineError> {
    settings.validate()?;
    storyboard.validate()?;
    ensure_out_dir(&settings.out_dir).await?;

    let total = storyboard.clips.len();
    let mut clip_paths = Vec::with_capacity(total);
    for (idx, clip) in storyboard.clips.iter().enumerate() {
        logi(format!(
            "\n=== Creating {} ({}/{}, {}) ===",
            clip.name,
            idx + 1,
            total,
            clip.seconds
        ));
        let path = run_clip(settings, storyboard, clip, api, sleeper).await?;
        clip_paths.push(path);
    }

    logi("\n=== Concatenating clips into final video ===");
    let final_out = settings.final_path();
    joiner
        .join(&clip_paths, &settings.manifest_path(), &final_out)
        .await?;

    logok(format!("Done: {}", final_out.display()));
    Ok(final_out)
}
