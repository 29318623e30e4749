//! Thumbnail and video upload flows
//!
//! Both flows run the same steps: ownership gate, multipart intake, (video
//! only) classification and faststart normalization, storage placement and
//! finally the record update. A failed record update rolls back any registry
//! placement made earlier in the flow. Temporary files are owned by guards and
//! removed on every exit path.

mod error;
pub mod intake;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::Multipart;
use backend_storage::video::{Video, VideoStore};
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub use error::{UploadError, UploadResult};

use crate::{
    media::MediaPipeline,
    placement::{Placement, PlacementStrategy, StoragePlacement, MAX_INLINE_THUMBNAIL_BYTES},
};

/// Form field carrying the thumbnail image
pub const THUMBNAIL_FIELD: &str = "thumbnail";

/// Form field carrying the video file
pub const VIDEO_FIELD: &str = "video";

/// Which location field of the record an upload writes
#[derive(Debug, Clone, Copy)]
enum Slot {
    Thumbnail,
    Video,
}

/// Runs the upload flows against the injected store, placement and media tools
pub struct UploadService {
    store: Arc<dyn VideoStore>,
    placement: Arc<StoragePlacement>,
    media: Arc<MediaPipeline>,
    temp_dir: PathBuf,
}

impl UploadService {
    /// Creates an upload service spooling videos into the system temp directory
    #[must_use]
    pub fn new(
        store: Arc<dyn VideoStore>,
        placement: Arc<StoragePlacement>,
        media: Arc<MediaPipeline>,
    ) -> Self {
        Self {
            store,
            placement,
            media,
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Spools videos into `temp_dir` instead
    #[must_use]
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    /// Loads `video_id` and checks that `user_id` owns it
    ///
    /// # Errors
    ///
    /// - `UploadError::VideoNotFound` if there is no such record
    /// - `UploadError::NotOwner` if the record belongs to someone else
    /// - `UploadError::Persistence` if the store cannot be read
    pub async fn authorize(&self, user_id: Uuid, video_id: Uuid) -> UploadResult<Video> {
        let video = self
            .store
            .get(video_id)
            .await?
            .ok_or(UploadError::VideoNotFound(video_id))?;

        if video.user_id != user_id {
            warn!(%video_id, %user_id, owner = %video.user_id, "Upload by non-owner rejected");
            return Err(UploadError::NotOwner);
        }

        Ok(video)
    }

    /// Stores a new thumbnail for `video_id` and returns the updated record
    ///
    /// # Errors
    ///
    /// Returns `UploadError` for ownership, intake, storage or persistence failures
    #[instrument(skip(self, multipart))]
    pub async fn upload_thumbnail(
        &self,
        user_id: Uuid,
        video_id: Uuid,
        mut multipart: Multipart,
    ) -> UploadResult<Video> {
        let video = self.authorize(user_id, video_id).await?;

        let upload = intake::read_thumbnail(&mut multipart, THUMBNAIL_FIELD).await?;

        if self.placement.thumbnail_strategy() == PlacementStrategy::Inline
            && upload.data.len() > MAX_INLINE_THUMBNAIL_BYTES
        {
            warn!(size = upload.data.len(), "Thumbnail too large to store inline");
            return Err(UploadError::PayloadTooLarge);
        }

        let placement = self
            .placement
            .place_thumbnail(video_id, upload.data, &upload.content_type)
            .await?;

        self.persist(video, Slot::Thumbnail, placement).await
    }

    /// Stores a new video file for `video_id` and returns the updated record
    ///
    /// # Errors
    ///
    /// Returns `UploadError` for ownership, intake, processing, storage or
    /// persistence failures
    #[instrument(skip(self, multipart))]
    pub async fn upload_video(
        &self,
        user_id: Uuid,
        video_id: Uuid,
        mut multipart: Multipart,
    ) -> UploadResult<Video> {
        let video = self.authorize(user_id, video_id).await?;

        let upload = intake::stream_video(&mut multipart, VIDEO_FIELD, &self.temp_dir).await?;

        let orientation = self.media.classify(upload.path()).await?;
        let processed = self.media.normalize(upload.path()).await?;

        let placement = self
            .placement
            .place_video(orientation, processed.path(), &upload.content_type)
            .await?;

        info!(%orientation, size = upload.size, "Video placed");

        self.persist(video, Slot::Video, placement).await
    }

    async fn persist(
        &self,
        mut video: Video,
        slot: Slot,
        placement: Placement,
    ) -> UploadResult<Video> {
        let location = Some(placement.location.clone());
        match slot {
            Slot::Thumbnail => video.thumbnail_url = location,
            Slot::Video => video.video_url = location,
        }
        video.updated_at = chrono::Utc::now().timestamp();

        if let Err(err) = self.store.update(&video).await {
            self.placement.rollback(placement).await;
            return Err(err.into());
        }

        info!(video_id = %video.id, ?slot, "Video record updated");

        Ok(video)
    }
}
