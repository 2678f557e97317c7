use anyhow::{Context, Result};
use clap::Parser;
use sora_shorts::api::OpenAiVideos;
use sora_shorts::config::{Config, Settings};
use sora_shorts::driver::run_pipeline;
use sora_shorts::ffmpeg::FfmpegJoiner;
use sora_shorts::init;
use sora_shorts::poll::TokioSleeper;
use sora_shorts::storyboard::Storyboard;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Generate every clip of a storyboard with Sora, then join them into one video.
#[derive(Debug, Parser)]
#[command(name = "sora-shorts", version)]
struct Args {
    /// JSON settings file; any field left out keeps its default
    #[arg(long)]
    settings: Option<PathBuf>,

    /// JSON storyboard to render instead of the built-in one
    #[arg(long)]
    storyboard: Option<PathBuf>,

    #[arg(long)]
    out_dir: Option<PathBuf>,

    #[arg(long)]
    model: Option<String>,

    /// Resolution as WIDTHxHEIGHT
    #[arg(long)]
    size: Option<String>,

    #[arg(long)]
    poll_seconds: Option<f64>,

    /// ffmpeg binary used for the final join
    #[arg(long)]
    ffmpeg: Option<PathBuf>,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(v) = &self.out_dir {
            settings.out_dir = v.clone();
        }
        if let Some(v) = &self.model {
            settings.model = v.clone();
        }
        if let Some(v) = &self.size {
            settings.size = v.clone();
        }
        if let Some(v) = self.poll_seconds {
            settings.poll_seconds = v;
        }
        if let Some(v) = &self.ffmpeg {
            settings.ffmpeg = v.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut settings = match &args.settings {
        Some(path) => Settings::load(path).await?,
        None => Settings::default(),
    };
    args.apply(&mut settings);
    settings.validate()?;

    let cfg = Config::from_env(settings)?;

    let storyboard = match &args.storyboard {
        Some(path) => Storyboard::load(path).await?,
        None => Storyboard::builtin(),
    };
    eprintln!(
        "[INFO] {} clips, {}s total, model {} at {} -> {}",
        storyboard.clips.len(),
        storyboard.total_seconds(),
        cfg.settings.model,
        cfg.settings.size,
        cfg.settings.final_path().display()
    );

    if !init::check_tool(&cfg.settings.ffmpeg).await {
        eprintln!(
            "[WARNING] {} not found. The final join will fail; install FFmpeg or pass --ffmpeg.",
            cfg.settings.ffmpeg.display()
        );
    }

    let api = OpenAiVideos::new(&cfg)?;
    let joiner = FfmpegJoiner::new(&cfg.settings.ffmpeg, &cfg.settings.ffprobe);

    run_pipeline(&cfg.settings, &storyboard, &api, &TokioSleeper, &joiner)
        .await
        .context("Generation run failed")?;
    Ok(())
}
