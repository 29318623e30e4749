//! Multipart intake: pulls one named field out of the request body

use std::path::Path;

use axum::{
    extract::multipart::{Field, MultipartError},
    extract::Multipart,
    http::StatusCode,
};
use bytes::Bytes;
use mime::Mime;
use tempfile::NamedTempFile;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::debug;

use super::{UploadError, UploadResult};

/// Prefix of every temporary upload file
pub const TEMP_FILE_PREFIX: &str = "tubely-upload";

/// Media types accepted for thumbnails
pub const THUMBNAIL_MEDIA_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

/// The only media type accepted for videos
pub const VIDEO_MEDIA_TYPE: &str = "video/mp4";

/// A form field read fully into memory
#[derive(Debug)]
pub struct BufferedUpload {
    /// Field contents
    pub data: Bytes,
    /// Declared media type, without parameters
    pub content_type: String,
}

/// A form field streamed to a temporary file
///
/// The file is deleted when this value is dropped.
#[derive(Debug)]
pub struct SpooledUpload {
    /// Backing temporary file, rewound to its start
    pub file: NamedTempFile,
    /// Declared media type, without parameters
    pub content_type: String,
    /// Number of bytes written
    pub size: u64,
}

impl SpooledUpload {
    /// Location of the temporary file
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

fn multipart_error(err: &MultipartError) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::PayloadTooLarge
    } else {
        UploadError::InvalidMultipart(err.body_text())
    }
}

async fn next_field(multipart: &mut Multipart) -> UploadResult<Option<Field<'_>>> {
    multipart.next_field().await.map_err(|e| multipart_error(&e))
}

/// Parses a declared content type and returns its essence if it is in `accepted`
fn accepted_media_type(declared: Option<&str>, accepted: &[&str]) -> UploadResult<String> {
    let declared = declared.ok_or(UploadError::MissingContentType)?;
    let media_type: Mime = declared
        .parse()
        .map_err(|_| UploadError::InvalidContentType(declared.to_string()))?;

    let essence = media_type.essence_str();
    if accepted.contains(&essence) {
        Ok(essence.to_string())
    } else {
        Err(UploadError::UnsupportedMediaType(essence.to_string()))
    }
}

/// Reads the thumbnail field into memory
///
/// # Errors
///
/// Returns `UploadError` if the field is missing, has an unsupported media type,
/// or the body is malformed or too large
pub async fn read_thumbnail(
    multipart: &mut Multipart,
    field_name: &'static str,
) -> UploadResult<BufferedUpload> {
    while let Some(field) = next_field(multipart).await? {
        if field.name() != Some(field_name) {
            continue;
        }

        let content_type = accepted_media_type(field.content_type(), &THUMBNAIL_MEDIA_TYPES)?;
        let data = field.bytes().await.map_err(|e| multipart_error(&e))?;

        debug!(size = data.len(), %content_type, "Read thumbnail field");

        return Ok(BufferedUpload { data, content_type });
    }

    Err(UploadError::MissingField(field_name))
}

/// Streams the video field into a temporary file under `temp_dir`
///
/// The media type is checked before the file is created, so a rejected upload
/// never touches the disk.
///
/// # Errors
///
/// Returns `UploadError` if the field is missing, is not `video/mp4`, the body is
/// malformed or too large, or the temporary file cannot be written
pub async fn stream_video(
    multipart: &mut Multipart,
    field_name: &'static str,
    temp_dir: &Path,
) -> UploadResult<SpooledUpload> {
    while let Some(mut field) = next_field(multipart).await? {
        if field.name() != Some(field_name) {
            continue;
        }

        let content_type = accepted_media_type(field.content_type(), &[VIDEO_MEDIA_TYPE])?;

        let file = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .suffix(".mp4")
            .tempfile_in(temp_dir)?;

        let mut writer = tokio::fs::File::from_std(file.reopen()?);
        let mut size = 0u64;

        while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(&e))? {
            writer.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }

        writer.flush().await?;
        writer.rewind().await?;

        debug!(size, path = %file.path().display(), "Spooled video field");

        return Ok(SpooledUpload {
            file,
            content_type,
            size,
        });
    }

    Err(UploadError::MissingField(field_name))
}
