//! Collaborator contracts the pipeline is written against.
//!
//! Production implementations live in `infrastructure` (S3, RabbitMQ, Redis) and
//! `modules::transcode::ffmpeg`; tests swap in the in-memory fakes.

use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tokio::io::AsyncRead;

use super::config::TranscodeConfig;
use super::error::{GuardError, NotifyError, ProcessError, StoreError};
use super::job::JobIdentity;

pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Opens a streaming read of the object body.
    async fn get_stream(&self, bucket: &str, key: &str) -> Result<ObjectReader, StoreError>;

    /// Opens an incremental upload. Nothing is visible at `key` until `finish` resolves.
    async fn put_stream(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<Box<dyn ObjectUpload>, StoreError>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    /// Time-limited, credential-free read URL.
    async fn signed_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StoreError>;
}

/// Write side of a streaming upload.
#[async_trait]
pub trait ObjectUpload: Send {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), StoreError>;

    async fn finish(self: Box<Self>) -> Result<(), StoreError>;

    async fn abort(self: Box<Self>) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct TranscodeReport {
    pub elapsed: Duration,
}

#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        config: &TranscodeConfig,
    ) -> Result<TranscodeReport, ProcessError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub message: String,
    pub url: String,
    pub bucket: String,
    pub key: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Duplicate-trigger guard keyed by job identity.
#[async_trait]
pub trait JobGuard: Send + Sync {
    /// Returns `false` when the identity is already held by another run.
    async fn acquire(&self, identity: &JobIdentity) -> Result<bool, GuardError>;

    /// Frees the identity so a redelivered trigger can retry.
    async fn release(&self, identity: &JobIdentity) -> Result<(), GuardError>;
}
