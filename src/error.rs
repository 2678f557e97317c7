use crate::api::VideoStatus;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop (or, for deletes, merely dent) a generation run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0} env var is not set")]
    MissingCredential(&'static str),

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("invalid storyboard: {0}")]
    Storyboard(String),

    #[error("{action} request failed")]
    Transport {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{action} stalled: nothing received for {after:?}")]
    Stalled {
        action: &'static str,
        after: std::time::Duration,
    },

    #[error("{action} returned HTTP {status}: {body}")]
    Api {
        action: &'static str,
        status: u16,
        body: String,
    },

    #[error("{clip} did not complete (status={status})")]
    ClipNotCompleted { clip: String, status: VideoStatus },

    #[error("download to {path} incomplete: wrote {written} of {expected} bytes")]
    IncompleteDownload {
        path: PathBuf,
        written: u64,
        expected: u64,
    },

    #[error("download to {0} produced an empty file")]
    EmptyDownload(PathBuf),

    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} could not be started")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("join failed: {0}")]
    JoinFailed(String),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
