use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object {bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn transcoder {}: {source}", binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transcoder exited with {status}")]
    Exit {
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("transcoder reported success but produced no output at {}", path.display())]
    MissingOutput { path: PathBuf },

    #[error("I/O error while running transcoder: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessError {
    /// Captured stdout/stderr of a failed run, if the process got that far.
    pub fn diagnostics(&self) -> Option<(&str, &str)> {
        match self {
            ProcessError::Exit { stdout, stderr, .. } => Some((stdout, stderr)),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to publish notification: {0}")]
    Publish(String),
}

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("job guard backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for GuardError {
    fn from(err: redis::RedisError) -> Self {
        GuardError::Backend(err.to_string())
    }
}

/// Failure of one pipeline stage. Any of these aborts the remaining stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid trigger event: {0}")]
    InvalidEvent(String),

    #[error("job guard unavailable: {0}")]
    Guard(#[source] GuardError),

    #[error("failed to prepare scratch space: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("download failed: {0}")]
    Download(#[source] StoreError),

    #[error("transcode failed: {0}")]
    Transcode(#[source] ProcessError),

    #[error("upload failed: {0}")]
    Upload(#[source] StoreError),

    #[error("failed to sign URL: {0}")]
    Sign(#[source] StoreError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidEvent,
    Guard,
    Scratch,
    Download,
    Transcode,
    Upload,
    Sign,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidEvent(_) => ErrorKind::InvalidEvent,
            PipelineError::Guard(_) => ErrorKind::Guard,
            PipelineError::Scratch(_) => ErrorKind::Scratch,
            PipelineError::Download(_) => ErrorKind::Download,
            PipelineError::Transcode(_) => ErrorKind::Transcode,
            PipelineError::Upload(_) => ErrorKind::Upload,
            PipelineError::Sign(_) => ErrorKind::Sign,
        }
    }
}
