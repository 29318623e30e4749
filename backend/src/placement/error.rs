//! Error types for bucket operations

use aws_sdk_s3::{
    error::SdkError,
    operation::{get_object::GetObjectError, put_object::PutObjectError},
};
use thiserror::Error;

/// Result type for bucket operations
pub type BucketResult<T> = Result<T, BucketError>;

/// Errors that can occur during bucket operations
#[derive(Error, Debug)]
pub enum BucketError {
    /// S3 service error
    #[error("S3 service error: {0}")]
    S3Error(String),

    /// AWS SDK error
    #[error("AWS SDK error: {0}")]
    AwsError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Upstream service error (5xx from S3)
    #[error("Upstream service error: {0}")]
    UpstreamError(String),

    /// A local body could not be read for upload
    #[error("Failed to read upload body: {0}")]
    BodyReadError(String),

    /// No object under the requested key
    #[error("Object not found: {0}")]
    ObjectNotFound(String),
}

impl From<SdkError<PutObjectError>> for BucketError {
    fn from(error: SdkError<PutObjectError>) -> Self {
        match error {
            SdkError::ServiceError(ref service_err)
                if service_err.raw().status().as_u16() >= 500 =>
            {
                Self::UpstreamError(format!("{:?}", service_err.err()))
            }
            SdkError::ServiceError(service_err) => {
                Self::S3Error(format!("{:?}", service_err.err()))
            }
            _ => Self::AwsError(error.to_string()),
        }
    }
}

impl From<SdkError<GetObjectError>> for BucketError {
    fn from(error: SdkError<GetObjectError>) -> Self {
        match error {
            SdkError::ServiceError(ref service_err) if service_err.err().is_no_such_key() => {
                Self::ObjectNotFound(format!("{:?}", service_err.err()))
            }
            SdkError::ServiceError(ref service_err)
                if service_err.raw().status().as_u16() >= 500 =>
            {
                Self::UpstreamError(format!("{:?}", service_err.err()))
            }
            SdkError::ServiceError(service_err) => {
                Self::S3Error(format!("{:?}", service_err.err()))
            }
            _ => Self::AwsError(error.to_string()),
        }
    }
}
