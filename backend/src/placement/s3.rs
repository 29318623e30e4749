//! S3-based object storage operations

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::{
    presigning::PresigningConfig, primitives::ByteStream, Client as S3Client,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use super::{BucketError, BucketResult};

/// Presigned URL with expiration information
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    /// The presigned URL for GET operations
    pub url: String,
    /// ISO-8601 UTC timestamp when the URL expires
    pub expires_at: DateTime<Utc>,
}

/// Payload of an object upload
#[derive(Debug, Clone)]
pub enum ObjectBody {
    /// Bytes already in memory
    Bytes(Bytes),
    /// A file streamed from disk
    File(PathBuf),
}

/// An object opened for download
#[derive(Debug)]
pub struct StoredObject {
    /// Object contents, streamed from storage
    pub body: ByteStream,
    /// Content type recorded at upload time
    pub content_type: Option<String>,
    /// Size in bytes, when known
    pub content_length: Option<i64>,
}

/// Object-storage capability used by the placement strategies
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Uploads `body` to `bucket/key`
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ObjectBody,
        content_type: &str,
    ) -> BucketResult<()>;

    /// Opens `bucket/key` for download
    async fn get_object(&self, bucket: &str, key: &str) -> BucketResult<StoredObject>;

    /// Generates a time-limited GET URL for `bucket/key`
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> BucketResult<PresignedUrl>;
}

/// Object storage client for S3 operations
pub struct S3ObjectStorage {
    s3_client: Arc<S3Client>,
}

impl S3ObjectStorage {
    /// Creates a new object storage client
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client
    #[must_use]
    pub const fn new(s3_client: Arc<S3Client>) -> Self {
        Self { s3_client }
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    /// Uploads an object
    ///
    /// # Errors
    ///
    /// Returns `BucketError::S3Error` for S3 service errors
    /// Returns `BucketError::UpstreamError` for 5xx errors
    /// Returns `BucketError::BodyReadError` if a file body cannot be opened
    #[instrument(skip(self, body))]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ObjectBody,
        content_type: &str,
    ) -> BucketResult<()> {
        let stream = match body {
            ObjectBody::Bytes(bytes) => ByteStream::from(bytes),
            ObjectBody::File(path) => ByteStream::from_path(&path).await.map_err(|e| {
                BucketError::BodyReadError(format!("Could not open {}: {e}", path.display()))
            })?,
        };

        self.s3_client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(stream)
            .send()
            .await?;

        debug!("Uploaded object {bucket}/{key}");

        Ok(())
    }

    /// Downloads an object as a stream
    ///
    /// # Errors
    ///
    /// Returns `BucketError::ObjectNotFound` if there is no such key
    /// Returns `BucketError::UpstreamError` for 5xx errors
    #[instrument(skip(self))]
    async fn get_object(&self, bucket: &str, key: &str) -> BucketResult<StoredObject> {
        let response = self
            .s3_client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await?;

        Ok(StoredObject {
            content_type: response.content_type().map(str::to_string),
            content_length: response.content_length(),
            body: response.body,
        })
    }

    /// Generates a presigned URL for GET operations
    ///
    /// # Errors
    ///
    /// Returns `BucketError::S3Error` if presigned URL generation fails
    /// Returns `BucketError::ConfigError` if presigning config creation fails
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> BucketResult<PresignedUrl> {
        let presigned_config = PresigningConfig::expires_in(expires_in).map_err(|e| {
            BucketError::ConfigError(format!("Failed to create presigning config: {e}"))
        })?;

        let presigned_request = self
            .s3_client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigned_config)
            .await
            .map_err(|e| BucketError::S3Error(format!("Failed to generate presigned URL: {e}")))?;

        let expires_at: DateTime<Utc> = Utc::now() + expires_in;

        Ok(PresignedUrl {
            url: presigned_request.uri().to_string(),
            expires_at,
        })
    }
}
