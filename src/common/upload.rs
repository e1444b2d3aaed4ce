use async_trait::async_trait;
use aws_sdk_s3::types::CompletedPart;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::infrastructure::storage::s3::StorageService;
use crate::modules::transcode::error::StoreError;
use crate::modules::transcode::ports::ObjectUpload;

// Minimum part size for S3 is 5MB. We use 6MB to be safe.
const MIN_PART_SIZE: usize = 6 * 1024 * 1024;

/// The multipart calls an uploader needs from the storage backend.
#[async_trait]
pub trait MultipartTarget: Send + Sync {
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<String, StoreError>;

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<CompletedPart, StoreError>;

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<(), StoreError>;

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), StoreError>;
}

/// Streams bytes into an S3 multipart upload, holding at most one part in memory.
pub struct MultipartUploader<T: MultipartTarget = StorageService> {
    storage: T,
    bucket: String,
    key: String,
    upload_id: String,
    parts: Vec<CompletedPart>,
    part_number: i32,
    buffer: Vec<u8>,
}

impl<T: MultipartTarget> MultipartUploader<T> {
    pub async fn new(
        storage: T,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<Self, StoreError> {
        let upload_id = storage
            .create_multipart_upload(bucket, key, content_type)
            .await?;

        Ok(Self {
            storage,
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id,
            parts: Vec::new(),
            part_number: 1,
            buffer: Vec::with_capacity(MIN_PART_SIZE),
        })
    }

    async fn flush_part(&mut self) -> Result<(), StoreError> {
        let body = Bytes::from(std::mem::take(&mut self.buffer));
        self.buffer.reserve(MIN_PART_SIZE);

        debug!(
            "Uploading part {} ({} bytes) of {}/{}",
            self.part_number,
            body.len(),
            self.bucket,
            self.key
        );

        let part = self
            .storage
            .upload_part(&self.bucket, &self.key, &self.upload_id, self.part_number, body)
            .await?;

        self.parts.push(part);
        self.part_number += 1;

        Ok(())
    }

    async fn complete(&mut self) -> Result<(), StoreError> {
        // an upload needs at least one part, even if it is empty
        if !self.buffer.is_empty() || self.parts.is_empty() {
            self.flush_part().await?;
        }

        self.storage
            .complete_multipart_upload(
                &self.bucket,
                &self.key,
                &self.upload_id,
                std::mem::take(&mut self.parts),
            )
            .await
    }
}

#[async_trait]
impl<T: MultipartTarget + 'static> ObjectUpload for MultipartUploader<T> {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), StoreError> {
        self.buffer.extend_from_slice(&chunk);

        if self.buffer.len() >= MIN_PART_SIZE {
            self.flush_part().await?;
        }

        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<(), StoreError> {
        let mut this = self;
        if let Err(e) = this.complete().await {
            if let Err(abort_err) = this
                .storage
                .abort_multipart_upload(&this.bucket, &this.key, &this.upload_id)
                .await
            {
                warn!("Failed to abort upload {}: {}", this.upload_id, abort_err);
            }
            return Err(e);
        }

        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<(), StoreError> {
        self.storage
            .abort_multipart_upload(&self.bucket, &self.key, &self.upload_id)
            .await
    }
}
