use crate::error::PipelineError;
use crate::storyboard::ClipSeconds;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub mod openai;

pub use openai::OpenAiVideos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl VideoStatus {
    /// No further transitions happen after one of these.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            VideoStatus::Completed | VideoStatus::Failed | VideoStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VideoStatus::Queued => "queued",
            VideoStatus::InProgress => "in_progress",
            VideoStatus::Completed => "completed",
            VideoStatus::Failed => "failed",
            VideoStatus::Cancelled => "cancelled",
            VideoStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A remote generation job as reported by create/retrieve.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VideoJob {
    pub id: String,
    pub status: VideoStatus,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub error: Option<JobError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateVideo {
    pub model: String,
    pub prompt: String,
    pub seconds: ClipSeconds,
    pub size: String,
}

/// The four calls the pipeline makes against the video service.
#[async_trait]
pub trait VideoApi: Send + Sync {
    async fn create(&self, request: &CreateVideo) -> Result<VideoJob, PipelineError>;

    async fn retrieve(&self, video_id: &str) -> Result<VideoJob, PipelineError>;

    /// Stream the finished video into `dest`; returns the number of bytes written.
    async fn download_content(&self, video_id: &str, dest: &Path) -> Result<u64, PipelineError>;

    async fn delete(&self, video_id: &str) -> Result<(), PipelineError>;
}
