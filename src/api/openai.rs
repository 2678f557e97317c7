use super::{CreateVideo, VideoApi, VideoJob};
use crate::config::Config;
use crate::error::PipelineError;
use crate::{logi, logw};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

const MAX_ERROR_BODY_CHARS: usize = 800;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for the `/videos` endpoints of the OpenAI API.
#[derive(Debug, Clone)]
pub struct OpenAiVideos {
    client: Client,
    api_base: String,
    api_key: String,
    download_timeout: Duration,
}

impl OpenAiVideos {
    pub fn new(cfg: &Config) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|source| PipelineError::Transport {
                action: "HTTP client setup",
                source,
            })?;
        Ok(Self::with_client(client, cfg))
    }

    pub fn with_client(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_base: cfg.settings.api_base.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            download_timeout: cfg.settings.download_timeout(),
        }
    }

    fn video_url(&self, video_id: &str) -> String {
        format!("{}/videos/{}", self.api_base, video_id)
    }
}

fn transport(action: &'static str) -> impl FnOnce(reqwest::Error) -> PipelineError {
    move |source| PipelineError::Transport { action, source }
}

async fn ensure_success(action: &'static str, resp: Response) -> Result<Response, PipelineError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let raw = resp.text().await.unwrap_or_default();
    let body = raw.chars().take(MAX_ERROR_BODY_CHARS).collect::<String>();
    logw(format!("{} HTTP {}", action, status.as_u16()));
    Err(PipelineError::Api {
        action,
        status: status.as_u16(),
        body,
    })
}

async fn read_job(action: &'static str, resp: Response) -> Result<VideoJob, PipelineError> {
    let resp = ensure_success(action, resp).await?;
    resp.json::<VideoJob>().await.map_err(transport(action))
}

#[async_trait]
impl VideoApi for OpenAiVideos {
    async fn create(&self, request: &CreateVideo) -> Result<VideoJob, PipelineError> {
        let body = json!({
            "model": request.model,
            "prompt": request.prompt,
            "seconds": request.seconds.as_str(),
            "size": request.size,
        });

        let resp = self
            .client
            .post(format!("{}/videos", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(CALL_TIMEOUT)
            .send()
            .await
            .map_err(transport("video create"))?;

        read_job("video create", resp).await
    }

    async fn retrieve(&self, video_id: &str) -> Result<VideoJob, PipelineError> {
        let resp = self
            .client
            .get(self.video_url(video_id))
            .bearer_auth(&self.api_key)
            .timeout(CALL_TIMEOUT)
            .send()
            .await
            .map_err(transport("video retrieve"))?;

        read_job("video retrieve", resp).await
    }

    async fn download_content(&self, video_id: &str, dest: &Path) -> Result<u64, PipelineError> {
        // download_timeout bounds each wait (headers, then every chunk), never the whole transfer.
        let request = self
            .client
            .get(format!("{}/content", self.video_url(video_id)))
            .bearer_auth(&self.api_key)
            .send();
        let resp = tokio::time::timeout(self.download_timeout, request)
            .await
            .map_err(|_| PipelineError::Stalled {
                action: "video download",
                after: self.download_timeout,
            })?
            .map_err(transport("video download"))?;
        let resp = ensure_success("video download", resp).await?;
        let expected = resp.content_length();

        let result = stream_to_file(resp, dest, self.download_timeout).await;
        let written = match result {
            Ok(n) => n,
            Err(err) => {
                let _ = fs::remove_file(dest).await;
                return Err(err);
            }
        };

        let short = match expected {
            _ if written == 0 => Some(PipelineError::EmptyDownload(dest.to_path_buf())),
            Some(expected) if written != expected => Some(PipelineError::IncompleteDownload {
                path: dest.to_path_buf(),
                written,
                expected,
            }),
            _ => None,
        };
        if let Some(err) = short {
            let _ = fs::remove_file(dest).await;
            return Err(err);
        }

        Ok(written)
    }

    async fn delete(&self, video_id: &str) -> Result<(), PipelineError> {
        let resp = self
            .client
            .delete(self.video_url(video_id))
            .bearer_auth(&self.api_key)
            .timeout(CALL_TIMEOUT)
            .send()
            .await
            .map_err(transport("video delete"))?;

        if resp.status() == StatusCode::NOT_FOUND {
            logi(format!("Remote video {} already gone.", video_id));
            return Ok(());
        }
        ensure_success("video delete", resp).await?;
        Ok(())
    }
}

async fn stream_to_file(
    resp: Response,
    dest: &Path,
    read_timeout: Duration,
) -> Result<u64, PipelineError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| PipelineError::io(parent, e))?;
    }

    let mut file = fs::File::create(dest)
        .await
        .map_err(|e| PipelineError::io(dest, e))?;
    let mut stream = resp.bytes_stream();
    let mut written = 0u64;

    loop {
        let next = tokio::time::timeout(read_timeout, stream.next())
            .await
            .map_err(|_| PipelineError::Stalled {
                action: "video download",
                after: read_timeout,
            })?;
        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk.map_err(transport("video download"))?;
        if chunk.is_empty() {
            continue;
        }
        file.write_all(&chunk)
            .await
            .map_err(|e| PipelineError::io(dest, e))?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| PipelineError::io(dest, e))?;
    Ok(written)
}
