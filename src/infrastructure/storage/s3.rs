use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use tracing::info;

use crate::common::upload::{MultipartTarget, MultipartUploader};
use crate::modules::transcode::error::StoreError;
use crate::modules::transcode::ports::{ObjectReader, ObjectStore, ObjectUpload};

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
}

/// Renders an SDK error with its full source chain.
pub(crate) fn backend_error<E: std::error::Error>(err: E) -> StoreError {
    StoreError::Backend(DisplayErrorContext(err).to_string())
}

impl StorageService {
    pub fn new(
        endpoint: Option<&str>,
        region: &str,
        access_key: &str,
        secret_key: &str,
        force_path_style: bool,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let mut config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .force_path_style(force_path_style); // MinIO needs path style

        if let Some(endpoint) = endpoint {
            config = config.endpoint_url(endpoint);
        }

        let client = Client::from_conf(config.build());

        info!(
            "✅ S3 client ready (region {}, endpoint {})",
            region,
            endpoint.unwrap_or("default")
        );

        Self { client }
    }
}

#[async_trait]
impl MultipartTarget for StorageService {
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let result = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(backend_error)?;

        result
            .upload_id
            .ok_or_else(|| StoreError::Backend("multipart upload returned no upload id".into()))
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<CompletedPart, StoreError> {
        let result = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(backend_error)?;

        let e_tag = result.e_tag.ok_or_else(|| {
            StoreError::Backend(format!("part {} returned no ETag", part_number))
        })?;

        Ok(CompletedPart::builder()
            .e_tag(e_tag)
            .part_number(part_number)
            .build())
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<(), StoreError> {
        let completed_multipart_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed_multipart_upload)
            .send()
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), StoreError> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(backend_error)?;

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn get_stream(&self, bucket: &str, key: &str) -> Result<ObjectReader, StoreError> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StoreError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    backend_error(e)
                }
            })?;

        let reader: ObjectReader = Box::pin(resp.body.into_async_read());
        Ok(reader)
    }

    async fn put_stream(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<Box<dyn ObjectUpload>, StoreError> {
        let uploader = MultipartUploader::new(self.clone(), bucket, key, content_type).await?;
        Ok(Box::new(uploader))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn signed_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StoreError> {
        let presigning = PresigningConfig::expires_in(expires_in).map_err(backend_error)?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(backend_error)?;

        Ok(request.uri().to_string())
    }
}
