use crate::error::PipelineError;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

static SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9][0-9]*x[1-9][0-9]*$").expect("size regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_size")]
    pub size: String,
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: f64,
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    #[serde(default = "default_final_name")]
    pub final_name: String,
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: PathBuf,
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

fn default_model() -> String {
    "sora-2".to_string()
}

fn default_size() -> String {
    "1280x720".to_string()
}

fn default_poll_seconds() -> f64 {
    2.0
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("Horror")
}

fn default_final_name() -> String {
    "final_60s.mp4".to_string()
}

fn default_manifest_name() -> String {
    "concat_list.txt".to_string()
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_download_timeout_secs() -> u64 {
    120
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: default_model(),
            size: default_size(),
            poll_seconds: default_poll_seconds(),
            out_dir: default_out_dir(),
            final_name: default_final_name(),
            manifest_name: default_manifest_name(),
            api_base: default_api_base(),
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

impl Settings {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read settings: {}", path.as_ref().display()))?;
        let settings: Settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings: {}", path.as_ref().display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.model.trim().is_empty() {
            return Err(PipelineError::Settings("model is empty".to_string()));
        }
        if !SIZE_RE.is_match(&self.size) {
            return Err(PipelineError::Settings(format!(
                "size must look like 1280x720, got {:?}",
                self.size
            )));
        }
        if !self.poll_seconds.is_finite() || self.poll_seconds <= 0.0 {
            return Err(PipelineError::Settings(format!(
                "poll_seconds must be positive, got {}",
                self.poll_seconds
            )));
        }
        if self.final_name.trim().is_empty() || self.manifest_name.trim().is_empty() {
            return Err(PipelineError::Settings(
                "final_name and manifest_name must be set".to_string(),
            ));
        }
        if self.final_name == self.manifest_name {
            return Err(PipelineError::Settings(
                "final_name and manifest_name must differ".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_seconds)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn clip_path(&self, clip_name: &str) -> PathBuf {
        self.out_dir.join(format!("{}.mp4", clip_name))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.out_dir.join(&self.manifest_name)
    }

    pub fn final_path(&self) -> PathBuf {
        self.out_dir.join(&self.final_name)
    }
}

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub settings: Settings,
}

impl Config {
    pub fn from_env(settings: Settings) -> Result<Self, PipelineError> {
        Self::from_lookup(settings, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(settings: Settings, lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(PipelineError::MissingCredential(API_KEY_ENV))?;
        Ok(Self { api_key, settings })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("settings", &self.settings)
            .finish()
    }
}
