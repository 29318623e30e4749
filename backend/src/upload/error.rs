use backend_storage::video::VideoStorageError;
use thiserror::Error;
use uuid::Uuid;

use crate::{media::MediaError, placement::BucketError};

/// Result type for upload flows
pub type UploadResult<T> = Result<T, UploadError>;

/// Errors raised by the thumbnail and video upload flows
#[derive(Error, Debug)]
pub enum UploadError {
    /// The multipart body could not be parsed
    #[error("Invalid multipart body: {0}")]
    InvalidMultipart(String),

    /// The body exceeded the route's size limit
    #[error("Upload exceeds the size limit")]
    PayloadTooLarge,

    /// The expected form field was not present
    #[error("Missing form field `{0}`")]
    MissingField(&'static str),

    /// The form field carried no content type
    #[error("Form field has no content type")]
    MissingContentType,

    /// The content type could not be parsed as a media type
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// The media type is not accepted for this upload
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// No video record with this ID
    #[error("Video {0} not found")]
    VideoNotFound(Uuid),

    /// The caller does not own the video
    #[error("Caller does not own the video")]
    NotOwner,

    /// Inspection or normalization failed
    #[error(transparent)]
    Processing(#[from] MediaError),

    /// The object storage upload failed
    #[error(transparent)]
    Storage(#[from] BucketError),

    /// The metadata store rejected the read or write
    #[error(transparent)]
    Persistence(#[from] VideoStorageError),

    /// The temporary upload file could not be written
    #[error("Temporary file error: {0}")]
    TempFile(#[from] std::io::Error),
}
