use crate::error::PipelineError;
use crate::{logi, logok, logw};
use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;

async fn run_cmd(program: &Path, args: &[String]) -> Result<(), PipelineError> {
    let status = Command::new(program)
        .args(args)
        .status()
        .await
        .map_err(|source| PipelineError::Spawn {
            program: program.display().to_string(),
            source,
        })?;

    if !status.success() {
        return Err(PipelineError::JoinFailed(format!(
            "{} exited with {}: {:?}",
            program.display(),
            status,
            args
        )));
    }

    Ok(())
}

/// Quote a path for an ffmpeg concat-demuxer `file` directive.
fn concat_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', r"'\''"))
}

/// Write the join manifest: one `file '<absolute path>'` line per clip, in order.
pub async fn write_manifest(clips: &[PathBuf], manifest: &Path) -> Result<(), PipelineError> {
    let mut text = String::new();
    for clip in clips {
        let abs = std::path::absolute(clip).map_err(|e| PipelineError::io(clip, e))?;
        text.push_str("file ");
        text.push_str(&concat_quote(&abs));
        text.push('\n');
    }

    fs::write(manifest, text.as_bytes())
        .await
        .map_err(|e| PipelineError::io(manifest, e))
}

/// Join the manifest's clips with stream copy (no re-encode).
pub async fn ffmpeg_concat_copy(
    ffmpeg: &Path,
    manifest: &Path,
    out_mp4: &Path,
) -> Result<(), PipelineError> {
    let args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        manifest.display().to_string(),
        "-c".to_string(),
        "copy".to_string(),
        out_mp4.display().to_string(),
    ];
    run_cmd(ffmpeg, &args).await?;

    if !out_mp4.exists() {
        return Err(PipelineError::JoinFailed(format!(
            "{} reported success but {} is missing",
            ffmpeg.display(),
            out_mp4.display()
        )));
    }
    Ok(())
}

pub async fn ffprobe_duration_seconds(ffprobe: &Path, path: &Path) -> anyhow::Result<f64> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe duration failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed"));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let duration = text.parse::<f64>().unwrap_or(-1.0);
    if duration <= 0.1 {
        return Err(anyhow::anyhow!("Invalid duration"));
    }
    Ok(duration)
}

/// Final step of a run: turn ordered clip files into one video.
#[async_trait]
pub trait Joiner: Send + Sync {
    async fn join(
        &self,
        clips: &[PathBuf],
        manifest: &Path,
        output: &Path,
    ) -> Result<(), PipelineError>;
}

#[derive(Debug, Clone)]
pub struct FfmpegJoiner {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl FfmpegJoiner {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

#[async_trait]
impl Joiner for FfmpegJoiner {
    async fn join(
        &self,
        clips: &[PathBuf],
        manifest: &Path,
        output: &Path,
    ) -> Result<(), PipelineError> {
        write_manifest(clips, manifest).await?;
        logi(format!(
            "Concat list: {} ({} clips) -> {}",
            manifest.display(),
            clips.len(),
            output.display()
        ));

        ffmpeg_concat_copy(&self.ffmpeg, manifest, output).await?;

        match ffprobe_duration_seconds(&self.ffprobe, output).await {
            Ok(d) => logok(format!("Final duration: {:.2} seconds", d)),
            Err(err) => logw(format!("Could not probe {}: {}", output.display(), err)),
        }
        Ok(())
    }
}
