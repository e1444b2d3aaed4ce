//! In-memory collaborators for pipeline and handler tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use super::config::TranscodeConfig;
use super::error::{NotifyError, ProcessError, StoreError};
use super::ports::{
    Notification, Notifier, ObjectReader, ObjectStore, ObjectUpload, TranscodeEngine,
    TranscodeReport,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    /// The body stream of a successful get breaks after the first bytes.
    Read,
    Put,
    /// Chunk writes on an open upload.
    Write,
    Delete,
    Sign,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCall {
    Get { bucket: String, key: String },
    Put { bucket: String, key: String, content_type: String },
    Delete { bucket: String, key: String },
    Sign { bucket: String, key: String, expires_in: Duration },
}

#[derive(Default)]
struct StoreState {
    objects: HashMap<(String, String), Vec<u8>>,
    calls: Vec<StoreCall>,
    failing: HashSet<StoreOp>,
    chunk_sizes: Vec<usize>,
    aborted: usize,
}

/// Object store backed by a map. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, bucket: &str, key: &str, body: &[u8]) -> Self {
        self.insert(bucket, key, body);
        self
    }

    pub fn insert(&self, bucket: &str, key: &str, body: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .objects
            .insert((bucket.to_string(), key.to_string()), body.to_vec());
    }

    pub fn fail(&self, op: StoreOp) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, op: StoreOp) -> usize {
        self.calls()
            .iter()
            .filter(|call| {
                matches!(
                    (op, call),
                    (StoreOp::Get, StoreCall::Get { .. })
                        | (StoreOp::Put, StoreCall::Put { .. })
                        | (StoreOp::Delete, StoreCall::Delete { .. })
                        | (StoreOp::Sign, StoreCall::Sign { .. })
                )
            })
            .count()
    }

    pub fn largest_chunk(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .chunk_sizes
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
    }

    pub fn aborted_uploads(&self) -> usize {
        self.state.lock().unwrap().aborted
    }

    fn record(&self, call: StoreCall, op: StoreOp) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing.contains(&op) {
            return Err(StoreError::Backend(format!("injected {:?} failure", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_stream(&self, bucket: &str, key: &str) -> Result<ObjectReader, StoreError> {
        self.record(
            StoreCall::Get {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            StoreOp::Get,
        )?;
        let body = self.object(bucket, key).ok_or_else(|| StoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;
        if self.state.lock().unwrap().failing.contains(&StoreOp::Read) {
            return Ok(Box::pin(std::io::Cursor::new(body).chain(ResetBody)));
        }
        Ok(Box::pin(std::io::Cursor::new(body)))
    }

    async fn put_stream(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<Box<dyn ObjectUpload>, StoreError> {
        self.record(
            StoreCall::Put {
                bucket: bucket.to_string(),
                key: key.to_string(),
                content_type: content_type.to_string(),
            },
            StoreOp::Put,
        )?;
        Ok(Box::new(MemoryUpload {
            store: self.clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            body: Vec::new(),
        }))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.record(
            StoreCall::Delete {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            StoreOp::Delete,
        )?;
        self.state
            .lock()
            .unwrap()
            .objects
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn signed_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StoreError> {
        self.record(
            StoreCall::Sign {
                bucket: bucket.to_string(),
                key: key.to_string(),
                expires_in,
            },
            StoreOp::Sign,
        )?;
        Ok(format!(
            "https://store.test/{}/{}?X-Amz-Expires={}",
            bucket,
            key,
            expires_in.as_secs()
        ))
    }
}

/// Body that fails like a dropped connection.
struct ResetBody;

impl AsyncRead for ResetBody {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Poll::Ready(Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset mid-body",
        )))
    }
}

struct MemoryUpload {
    store: MemoryStore,
    bucket: String,
    key: String,
    body: Vec<u8>,
}

#[async_trait]
impl ObjectUpload for MemoryUpload {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), StoreError> {
        let mut state = self.store.state.lock().unwrap();
        if state.failing.contains(&StoreOp::Write) {
            return Err(StoreError::Backend("injected Write failure".to_string()));
        }
        state.chunk_sizes.push(chunk.len());
        drop(state);
        self.body.extend_from_slice(&chunk);
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<(), StoreError> {
        self.store.insert(&self.bucket, &self.key, &self.body);
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<(), StoreError> {
        self.store.state.lock().unwrap().aborted += 1;
        Ok(())
    }
}

/// Engine that "transcodes" by prefixing the input bytes.
#[derive(Clone, Default)]
pub struct FakeEngine {
    calls: Arc<Mutex<Vec<(PathBuf, PathBuf, TranscodeConfig)>>>,
    fail: bool,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, PathBuf, TranscodeConfig)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscodeEngine for FakeEngine {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        config: &TranscodeConfig,
    ) -> Result<TranscodeReport, ProcessError> {
        self.calls
            .lock()
            .unwrap()
            .push((input.to_path_buf(), output.to_path_buf(), config.clone()));

        if self.fail {
            return Err(ProcessError::Exit {
                status: "exit status: 1".to_string(),
                stdout: String::new(),
                stderr: "Invalid data found when processing input".to_string(),
            });
        }

        let mut body = b"transcoded:".to_vec();
        body.extend(tokio::fs::read(input).await?);
        tokio::fs::write(output, body).await?;
        Ok(TranscodeReport {
            elapsed: Duration::from_millis(1),
        })
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Publish("broker unreachable".to_string()));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
