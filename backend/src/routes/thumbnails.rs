use std::sync::Arc;

use axum::{
    extract::Multipart,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use tracing::instrument;

use super::videos::{self, VideoResponse};
use crate::{
    middleware::AuthenticatedUser,
    placement::{StoragePlacement, ThumbnailRegistry},
    types::{AppError, VideoIdPath},
    upload::UploadService,
};

/// Uploads a thumbnail image for a video owned by the caller
///
/// Expects a multipart form with a `thumbnail` field of type `image/jpeg` or
/// `image/png`, up to 10 MiB. Where the image ends up depends on the
/// deployment's placement strategy.
///
/// # Errors
///
/// - `invalid_file_type` - Not a JPEG or PNG
/// - `missing_field` / `invalid_form` - Malformed form
/// - `payload_too_large` - Body above 10 MiB
/// - `forbidden` - The caller does not own the video
/// - `not_found` - No such video
/// - `storage_error` / `upstream_error` - Object storage upload failed
/// - `persistence_error` - The record could not be updated
#[instrument(skip(uploads, placement, multipart), fields(user_id = %user.user_id))]
pub async fn upload_thumbnail(
    Extension(uploads): Extension<Arc<UploadService>>,
    Extension(placement): Extension<Arc<StoragePlacement>>,
    user: AuthenticatedUser,
    VideoIdPath(video_id): VideoIdPath,
    multipart: Multipart,
) -> Result<Json<VideoResponse>, AppError> {
    let video = uploads
        .upload_thumbnail(user.user_id, video_id, multipart)
        .await?;

    videos::respond(&placement, video).await
}

/// Serves a thumbnail held in the in-memory registry
#[instrument(skip(registry))]
pub async fn get_thumbnail(
    Extension(registry): Extension<Arc<ThumbnailRegistry>>,
    VideoIdPath(video_id): VideoIdPath,
) -> Result<Response, AppError> {
    let thumbnail = registry.get(video_id).await.ok_or_else(|| {
        AppError::new(
            StatusCode::NOT_FOUND,
            "not_found",
            "Thumbnail not found",
            false,
        )
    })?;

    Ok((
        [(header::CONTENT_TYPE, thumbnail.content_type)],
        thumbnail.data,
    )
        .into_response())
}
