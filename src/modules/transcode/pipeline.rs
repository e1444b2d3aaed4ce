use std::sync::Arc;

use futures_util::TryStreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use super::config::PipelineConfig;
use super::error::{PipelineError, StoreError};
use super::events::TriggerEvent;
use super::guard::NoopJobGuard;
use super::job::{detect_extension, JobContext, JobIdentity, ScratchSpace};
use super::notifier::NoopNotifier;
use super::outcome::{PipelineFailure, PipelineOutcome, SkipReason};
use super::ports::{
    JobGuard, Notification, Notifier, ObjectStore, ObjectUpload, TranscodeEngine,
};

/// Read size when streaming the transcoded file to the store.
const UPLOAD_CHUNK_SIZE: usize = 1024 * 1024;

/// Result of the stages that ran to completion.
struct Completion {
    url: String,
    warnings: Vec<String>,
}

/// Download, transcode, upload, delete source, sign URL, notify. Stages run strictly in
/// order and the first failure ends the invocation, except for the source delete and the
/// notification which only downgrade the outcome to a warning.
///
/// Two invocations for the same source key are not serialised against each other unless a
/// [`JobGuard`] other than the default no-op is installed.
pub struct TranscodePipeline {
    config: PipelineConfig,
    store: Arc<dyn ObjectStore>,
    engine: Arc<dyn TranscodeEngine>,
    notifier: Arc<dyn Notifier>,
    guard: Arc<dyn JobGuard>,
}

impl TranscodePipeline {
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn ObjectStore>,
        engine: Arc<dyn TranscodeEngine>,
    ) -> Self {
        Self {
            config,
            store,
            engine,
            notifier: Arc::new(NoopNotifier),
            guard: Arc::new(NoopJobGuard),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_guard(mut self, guard: Arc<dyn JobGuard>) -> Self {
        self.guard = guard;
        self
    }

    pub async fn run(&self, event: &TriggerEvent) -> PipelineOutcome {
        let Some(record) = event.first_record() else {
            let error = PipelineError::InvalidEvent("event carries no records".to_string());
            error!("❌ {}", error);
            return PipelineOutcome::Failed(PipelineFailure::new("", "", None, &error));
        };

        if event.ignored_records() > 0 {
            warn!(
                "Trigger carried {} records, ignoring all but the first",
                event.records.len()
            );
        }

        let bucket = record.s3.bucket.name.as_str();
        info!(
            "Received {} for {}/{} ({} bytes)",
            record.event_name.as_deref().unwrap_or("event"),
            bucket,
            record.s3.object.key,
            record
                .s3
                .object
                .size
                .map_or_else(|| "unknown".to_string(), |size| size.to_string())
        );
        let source_key = match record.s3.object.decoded_key() {
            Ok(key) => key,
            Err(e) => {
                let error = PipelineError::InvalidEvent(format!("undecodable object key: {}", e));
                error!("❌ {}", error);
                return PipelineOutcome::Failed(PipelineFailure::new(
                    bucket,
                    &record.s3.object.key,
                    None,
                    &error,
                ));
            }
        };

        let span = tracing::info_span!(
            "transcode",
            job_id = %Uuid::new_v4(),
            bucket = %bucket,
            key = %source_key
        );

        let identity = JobIdentity::new(bucket, &source_key, record.s3.object.revision());
        self.run_object(bucket, &source_key, identity)
            .instrument(span)
            .await
    }

    async fn run_object(
        &self,
        bucket: &str,
        source_key: &str,
        identity: JobIdentity,
    ) -> PipelineOutcome {
        let extension = match detect_extension(source_key, &self.config.accepted_extensions) {
            Ok(ext) => ext,
            Err(reason) => {
                info!("Skipping non-video object {}: {:?}", source_key, reason);
                return PipelineOutcome::Skipped {
                    source_key: source_key.to_string(),
                    reason,
                };
            }
        };

        match self.guard.acquire(&identity).await {
            Ok(true) => {}
            Ok(false) => {
                info!("Job {} already claimed, skipping duplicate trigger", identity);
                return PipelineOutcome::Skipped {
                    source_key: source_key.to_string(),
                    reason: SkipReason::Duplicate {
                        job: identity.to_string(),
                    },
                };
            }
            Err(e) => {
                let error = PipelineError::Guard(e);
                error!("❌ Unable to claim job {}: {}", identity, error);
                return PipelineOutcome::Failed(PipelineFailure::new(
                    bucket,
                    source_key,
                    Some(&self.config.destination.render(source_key)),
                    &error,
                ));
            }
        }

        let scratch = match ScratchSpace::create(&self.config.scratch_root) {
            Ok(scratch) => scratch,
            Err(e) => {
                let error = PipelineError::Scratch(e);
                self.release(&identity).await;
                return self.failed(
                    bucket,
                    source_key,
                    &self.config.destination.render(source_key),
                    error,
                );
            }
        };
        let job = JobContext::new(bucket, source_key, extension, &self.config, scratch.path());
        info!(
            "Transcoding {} ({}) into {}",
            job.source_key, job.file_extension, job.destination_key
        );

        // scratch is dropped at the end of this function on every path
        match self.execute(&job).await {
            Ok(completion) => {
                info!(
                    "✅ Transcoded {}/{} and uploaded to {}/{}",
                    job.bucket, job.source_key, job.bucket, job.destination_key
                );
                if completion.warnings.is_empty() {
                    PipelineOutcome::Completed {
                        bucket: job.bucket,
                        source_key: job.source_key,
                        destination_key: job.destination_key,
                        url: completion.url,
                    }
                } else {
                    PipelineOutcome::CompletedWithCleanupWarning {
                        bucket: job.bucket,
                        source_key: job.source_key,
                        destination_key: job.destination_key,
                        url: completion.url,
                        warning: completion.warnings.join("; "),
                    }
                }
            }
            Err(error) => {
                self.release(&identity).await;
                self.failed(&job.bucket, &job.source_key, &job.destination_key, error)
            }
        }
    }

    async fn execute(&self, job: &JobContext) -> Result<Completion, PipelineError> {
        self.download(job).await.map_err(PipelineError::Download)?;
        self.transcode(job).await?;
        self.upload(job).await.map_err(PipelineError::Upload)?;
        let mut warnings: Vec<String> = self.delete_source(job).await.into_iter().collect();
        let url = self.sign(job).await.map_err(PipelineError::Sign)?;
        warnings.extend(self.notify(job, &url).await);

        Ok(Completion { url, warnings })
    }

    async fn download(&self, job: &JobContext) -> Result<(), StoreError> {
        info!("⬇️ Downloading {}/{}", job.bucket, job.source_key);
        let mut source = self.store.get_stream(&job.bucket, &job.source_key).await?;

        let mut file = File::create(&job.local_input_path).await?;
        let bytes = tokio::io::copy(&mut source, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;

        info!(
            "⬇️ Downloaded {} bytes to {}",
            bytes,
            job.local_input_path.display()
        );
        Ok(())
    }

    async fn transcode(&self, job: &JobContext) -> Result<(), PipelineError> {
        match self
            .engine
            .transcode(
                &job.local_input_path,
                &job.local_output_path,
                &self.config.transcode,
            )
            .await
        {
            Ok(report) => {
                info!("Transcode finished in {:.1}s", report.elapsed.as_secs_f64());
                Ok(())
            }
            Err(e) => {
                if let Some((stdout, stderr)) = e.diagnostics() {
                    error!("transcoder stdout:\n{}", stdout);
                    error!("transcoder stderr:\n{}", stderr);
                }
                Err(PipelineError::Transcode(e))
            }
        }
    }

    async fn upload(&self, job: &JobContext) -> Result<(), StoreError> {
        info!(
            "⬆️ Uploading {} to {}/{}",
            job.local_output_path.display(),
            job.bucket,
            job.destination_key
        );

        let content_type = mime_guess::from_ext(&self.config.transcode.container)
            .first_or_octet_stream()
            .to_string();
        let file = File::open(&job.local_output_path).await?;
        let mut chunks = ReaderStream::with_capacity(file, UPLOAD_CHUNK_SIZE);
        let mut upload = self
            .store
            .put_stream(&job.bucket, &job.destination_key, &content_type)
            .await?;

        loop {
            let next = match chunks.try_next().await {
                Ok(next) => next,
                Err(e) => {
                    abort_quietly(upload).await;
                    return Err(e.into());
                }
            };
            let Some(chunk) = next else { break };

            if let Err(e) = upload.write_chunk(chunk).await {
                abort_quietly(upload).await;
                return Err(e);
            }
        }

        upload.finish().await?;
        info!("⬆️ Upload complete");
        Ok(())
    }

    /// Best effort: a failed delete leaves the source in place and becomes a warning.
    async fn delete_source(&self, job: &JobContext) -> Option<String> {
        match self.store.delete(&job.bucket, &job.source_key).await {
            Ok(()) => {
                info!("🗑️ Deleted source {}/{}", job.bucket, job.source_key);
                None
            }
            Err(e) => {
                warn!(
                    "Failed to delete source {}/{}, it will remain in the bucket: {}",
                    job.bucket, job.source_key, e
                );
                Some(format!("source object was not deleted: {}", e))
            }
        }
    }

    async fn sign(&self, job: &JobContext) -> Result<String, StoreError> {
        self.store
            .signed_url(
                &job.bucket,
                &job.destination_key,
                self.config.signed_url_expiry,
            )
            .await
    }

    /// Best effort: the object is already published, so a failed send only becomes a warning.
    async fn notify(&self, job: &JobContext, url: &str) -> Option<String> {
        let notification = Notification {
            subject: self.config.notify_subject.clone(),
            message: format!("Video available for download here: {}", url),
            url: url.to_string(),
            bucket: job.bucket.clone(),
            key: job.destination_key.clone(),
        };

        match self.notifier.publish(&notification).await {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    "Failed to send notification for {}/{}: {}",
                    job.bucket, job.destination_key, e
                );
                Some(format!("notification was not sent: {}", e))
            }
        }
    }

    async fn release(&self, identity: &JobIdentity) {
        if let Err(e) = self.guard.release(identity).await {
            warn!("Failed to release job {}: {}", identity, e);
        }
    }

    fn failed(
        &self,
        bucket: &str,
        source_key: &str,
        destination_key: &str,
        error: PipelineError,
    ) -> PipelineOutcome {
        error!(
            "❌ Unable to transcode {}/{} and upload to {}/{}: {}",
            bucket, source_key, bucket, destination_key, error
        );
        PipelineOutcome::Failed(PipelineFailure::new(
            bucket,
            source_key,
            Some(destination_key),
            &error,
        ))
    }
}

async fn abort_quietly(upload: Box<dyn ObjectUpload>) {
    if let Err(e) = upload.abort().await {
        warn!("Failed to abort upload: {}", e);
    }
}
