//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use backend_storage::video::VideoStorageError;
use schemars::JsonSchema;
use serde::Serialize;

use crate::{placement::BucketError, upload::UploadError};

/// API error response envelope
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Whether the client should retry the request
    pub allow_retry: bool,
    /// Error details
    error: ErrorBody,
}

/// Error body containing code and message
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    /// Machine-readable error code
    pub code: &'static str,
    /// Human-readable error message
    pub message: &'static str,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub const fn new(
        status: StatusCode,
        code: &'static str,
        msg: &'static str,
        retry: bool,
    ) -> Self {
        Self {
            status,
            inner: ApiErrorResponse {
                allow_retry: retry,
                error: ErrorBody { code, message: msg },
            },
        }
    }

    /// HTTP status this error renders with
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// 401 for a missing, malformed, invalid or expired token
    #[must_use]
    pub const fn unauthenticated(code: &'static str, msg: &'static str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, msg, false)
    }

    /// 404 for an unknown video
    #[must_use]
    pub const fn video_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", "Video not found", false)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.status.as_u16() {
            400..=499 => tracing::warn!(
                "Client error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            500..=599 => tracing::error!(
                "Server error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            _ => {}
        }

        (self.status, Json(self.inner)).into_response()
    }
}

/// Convert bucket errors to application errors
impl From<BucketError> for AppError {
    #[allow(clippy::cognitive_complexity)]
    fn from(err: BucketError) -> Self {
        use BucketError::{
            AwsError, BodyReadError, ConfigError, ObjectNotFound, S3Error, UpstreamError,
        };

        match &err {
            UpstreamError(msg) => {
                tracing::error!("S3 upstream error: {msg}");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "upstream_error",
                    "S3 service temporarily unavailable",
                    true,
                )
            }
            S3Error(msg) | AwsError(msg) | BodyReadError(msg) => {
                tracing::error!("S3/AWS error: {msg}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_error",
                    "Error uploading file to storage",
                    true,
                )
            }
            ConfigError(msg) => {
                tracing::error!("Configuration error: {msg}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                    false,
                )
            }
            ObjectNotFound(msg) => {
                tracing::debug!("Object not found: {msg}");
                Self::new(
                    StatusCode::NOT_FOUND,
                    "not_found",
                    "Asset not found",
                    false,
                )
            }
        }
    }
}

/// Convert metadata store errors outside the upload flows
impl From<VideoStorageError> for AppError {
    fn from(err: VideoStorageError) -> Self {
        tracing::error!("Video store error: {err}");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error",
            true,
        )
    }
}

/// Convert upload flow errors to application errors
impl From<UploadError> for AppError {
    #[allow(clippy::cognitive_complexity)]
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::InvalidMultipart(msg) => {
                tracing::warn!("Multipart parse error: {msg}");
                Self::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_form",
                    "Unable to parse form data",
                    false,
                )
            }
            UploadError::PayloadTooLarge => Self::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                "Upload exceeds the maximum allowed size",
                false,
            ),
            UploadError::MissingField(field) => {
                tracing::debug!("Missing form field: {field}");
                Self::new(
                    StatusCode::BAD_REQUEST,
                    "missing_field",
                    "Unable to find form file",
                    false,
                )
            }
            UploadError::MissingContentType => Self::new(
                StatusCode::BAD_REQUEST,
                "missing_content_type",
                "Form file has no content type",
                false,
            ),
            UploadError::InvalidContentType(value) => {
                tracing::debug!("Unparsable content type: {value}");
                Self::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_content_type",
                    "Could not parse the media type",
                    false,
                )
            }
            UploadError::UnsupportedMediaType(value) => {
                tracing::debug!("Rejected media type: {value}");
                Self::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_file_type",
                    "Invalid file type",
                    false,
                )
            }
            UploadError::VideoNotFound(_) => Self::video_not_found(),
            UploadError::NotOwner => Self::new(
                StatusCode::FORBIDDEN,
                "forbidden",
                "You are not the owner of this video",
                false,
            ),
            UploadError::Processing(err) => {
                tracing::error!("Media processing error: {err}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "processing_error",
                    "Error processing video",
                    false,
                )
            }
            UploadError::Storage(err) => err.into(),
            UploadError::Persistence(err) => {
                tracing::error!("Persistence error: {err}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "persistence_error",
                    "Couldn't update video",
                    true,
                )
            }
            UploadError::TempFile(err) => {
                tracing::error!("Temporary file error: {err}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Could not write file to disk",
                    true,
                )
            }
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}
