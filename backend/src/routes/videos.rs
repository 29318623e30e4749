use std::sync::Arc;

use axum::{extract::Multipart, Extension, Json};
use backend_storage::video::{Video, VideoCreateRequest, VideoStore};
use chrono::DateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::{
    middleware::AuthenticatedUser,
    placement::StoragePlacement,
    types::{AppError, ValidatedJson, VideoIdPath},
    upload::UploadService,
};

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct CreateVideoRequest {
    /// Display title, 1 to 200 characters
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Free-form description, up to 5000 characters
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
}

/// A video record with client-fetchable locations
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VideoResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    /// Thumbnail location (data URL, server URL or object URL)
    pub thumbnail_url: Option<String>,
    /// Video location; presigned URLs expire after a few minutes
    pub video_url: Option<String>,
    /// ISO-8601 UTC
    pub created_at: String,
    /// ISO-8601 UTC
    pub updated_at: String,
}

fn rfc3339(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|time| time.to_rfc3339())
        .unwrap_or_default()
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        Self {
            id: video.id,
            user_id: video.user_id,
            title: video.title,
            description: video.description,
            thumbnail_url: video.thumbnail_url,
            video_url: video.video_url,
            created_at: rfc3339(video.created_at),
            updated_at: rfc3339(video.updated_at),
        }
    }
}

/// Resolves stored locations and converts to the response shape
pub(super) async fn respond(
    placement: &StoragePlacement,
    video: Video,
) -> Result<Json<VideoResponse>, AppError> {
    let video = placement.resolve_video(video).await?;
    Ok(Json(video.into()))
}

/// Creates a draft video owned by the caller
///
/// # Errors
///
/// - `validation_error` - Title or description out of bounds
/// - `internal_error` - The metadata store rejected the write
#[instrument(skip(store, payload), fields(user_id = %user.user_id))]
pub async fn create_video(
    Extension(store): Extension<Arc<dyn VideoStore>>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<CreateVideoRequest>,
) -> Result<Json<VideoResponse>, AppError> {
    let video = store
        .create(VideoCreateRequest {
            user_id: user.user_id,
            title: payload.title,
            description: payload.description,
        })
        .await?;

    tracing::info!(video_id = %video.id, "Draft video created");

    Ok(Json(video.into()))
}

/// Lists the caller's videos, newest first
#[instrument(skip(store, placement), fields(user_id = %user.user_id))]
pub async fn list_videos(
    Extension(store): Extension<Arc<dyn VideoStore>>,
    Extension(placement): Extension<Arc<StoragePlacement>>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<VideoResponse>>, AppError> {
    let videos = store.list_by_owner(user.user_id).await?;

    let mut resolved = Vec::with_capacity(videos.len());
    for video in videos {
        resolved.push(placement.resolve_video(video).await?.into());
    }

    Ok(Json(resolved))
}

/// Fetches one video with resolved locations
///
/// # Errors
///
/// - `not_found` - No such video
/// - `invalid_id` - The path segment is not a UUID
#[instrument(skip(store, placement))]
pub async fn get_video(
    Extension(store): Extension<Arc<dyn VideoStore>>,
    Extension(placement): Extension<Arc<StoragePlacement>>,
    VideoIdPath(video_id): VideoIdPath,
) -> Result<Json<VideoResponse>, AppError> {
    let video = store
        .get(video_id)
        .await?
        .ok_or_else(AppError::video_not_found)?;

    respond(&placement, video).await
}

/// Uploads the video file for a video owned by the caller
///
/// Expects a multipart form with a `video` field of type `video/mp4`, up to
/// 1 GiB. The file is classified by aspect ratio, rewritten for faststart
/// playback and stored under `landscape/`, `portrait/` or `other/`.
///
/// # Errors
///
/// - `invalid_file_type` - The field is not `video/mp4`
/// - `missing_field` / `invalid_form` - Malformed form
/// - `payload_too_large` - Body above 1 GiB
/// - `forbidden` - The caller does not own the video
/// - `not_found` - No such video
/// - `processing_error` - Inspection or faststart rewrite failed
/// - `storage_error` / `upstream_error` - Object storage upload failed
/// - `persistence_error` - The record could not be updated
#[instrument(skip(uploads, placement, multipart), fields(user_id = %user.user_id))]
pub async fn upload_video(
    Extension(uploads): Extension<Arc<UploadService>>,
    Extension(placement): Extension<Arc<StoragePlacement>>,
    user: AuthenticatedUser,
    VideoIdPath(video_id): VideoIdPath,
    multipart: Multipart,
) -> Result<Json<VideoResponse>, AppError> {
    let video = uploads
        .upload_video(user.user_id, video_id, multipart)
        .await?;

    respond(&placement, video).await
}
