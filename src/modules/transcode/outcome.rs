use serde::Serialize;

use super::error::{ErrorKind, PipelineError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    NoExtension,
    UnsupportedExtension { extension: String },
    Duplicate { job: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineFailure {
    pub bucket: String,
    pub source_key: String,
    pub destination_key: Option<String>,
    pub kind: ErrorKind,
    pub detail: String,
}

impl PipelineFailure {
    pub fn new(
        bucket: &str,
        source_key: &str,
        destination_key: Option<&str>,
        error: &PipelineError,
    ) -> Self {
        Self {
            bucket: bucket.to_string(),
            source_key: source_key.to_string(),
            destination_key: destination_key.map(str::to_string),
            kind: error.kind(),
            detail: error.to_string(),
        }
    }
}

/// Terminal state of one invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Completed {
        bucket: String,
        source_key: String,
        destination_key: String,
        url: String,
    },
    /// Transcoded and published, but the source object could not be deleted.
    CompletedWithCleanupWarning {
        bucket: String,
        source_key: String,
        destination_key: String,
        url: String,
        warning: String,
    },
    Skipped {
        source_key: String,
        reason: SkipReason,
    },
    Failed(PipelineFailure),
}

impl PipelineOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, PipelineOutcome::Failed(_))
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            PipelineOutcome::Completed { url, .. }
            | PipelineOutcome::CompletedWithCleanupWarning { url, .. } => Some(url),
            _ => None,
        }
    }

    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            PipelineOutcome::Failed(failure) => Some(failure.kind),
            _ => None,
        }
    }
}
