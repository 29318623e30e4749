//! Storage placement: decides where an uploaded asset lives and what
//! location string is persisted on the video record.
//!
//! Thumbnails follow the configured [`PlacementStrategy`]; videos always go to
//! object storage under an orientation prefix. Object locations are written
//! in the deployment's [`ObjectUrlForm`]. Records written with the
//! `bucket,key` form are turned into presigned GET URLs when read.

mod error;
mod registry;
mod s3;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use backend_storage::video::Video;
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use bytes::Bytes;
use rand::RngCore;
use strum::{Display, EnumString};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

pub use error::{BucketError, BucketResult};
pub use registry::{Insertion, StoredThumbnail, ThumbnailRegistry};
pub use s3::{ObjectBody, ObjectStorage, PresignedUrl, S3ObjectStorage, StoredObject};

use crate::media::Orientation;

/// Largest thumbnail stored inline
///
/// A `DynamoDB` item is capped at 400 KB; base64 grows the image by a third and
/// the rest of the record needs room too.
pub const MAX_INLINE_THUMBNAIL_BYTES: usize = 256 * 1024;

/// Where thumbnails are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum PlacementStrategy {
    /// Base64 `data:` URL embedded in the record
    Inline,
    /// Process-local registry served by `GET /api/thumbnails/{videoID}`
    Registry,
    /// Object storage bucket
    ObjectStorage,
}

/// How an object-storage location is written to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ObjectUrlForm {
    /// `https://<bucket>.s3.<region>.amazonaws.com/<key>`
    Public,
    /// `<bucket>,<key>`, presigned on read
    Presigned,
    /// `<platform base URL>/assets/<key>`, served by `GET /assets/{*key}`
    Platform,
}

/// Static placement settings for a deployment
#[derive(Debug, Clone)]
pub struct PlacementConfig {
    /// Strategy for thumbnails
    pub thumbnail_strategy: PlacementStrategy,
    /// Location form for objects
    pub url_form: ObjectUrlForm,
    /// Media bucket
    pub bucket: String,
    /// Region of the media bucket
    pub region: String,
    /// Externally reachable base URL of this server, without trailing slash
    pub platform_base_url: String,
    /// Lifetime of presigned GET URLs
    pub presign_ttl: Duration,
}

/// Result of placing an asset
#[derive(Debug)]
pub struct Placement {
    /// Location string to persist on the record
    pub location: String,
    registry_entry: Option<Insertion>,
}

impl Placement {
    const fn at(location: String) -> Self {
        Self {
            location,
            registry_entry: None,
        }
    }
}

/// A `bucket,key` location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectLocation<'a> {
    /// Bucket name
    pub bucket: &'a str,
    /// Object key
    pub key: &'a str,
}

impl<'a> ObjectLocation<'a> {
    /// Parses a `bucket,key` pair; URLs and `data:` URLs are never pairs
    #[must_use]
    pub fn parse(location: &'a str) -> Option<Self> {
        if location.starts_with("data:") || location.contains("://") {
            return None;
        }
        let (bucket, key) = location.split_once(',')?;
        if bucket.is_empty() || key.is_empty() || key.contains(',') {
            return None;
        }
        Some(Self { bucket, key })
    }
}

/// `data:<content-type>;base64,<payload>`
#[must_use]
pub fn data_url(content_type: &str, data: &[u8]) -> String {
    format!("data:{content_type};base64,{}", STANDARD.encode(data))
}

/// Random object name with an extension derived from `content_type`
#[must_use]
pub fn asset_path(content_type: &str) -> String {
    let mut random = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random);

    let extension = content_type
        .split_once('/')
        .map(|(_, subtype)| subtype.split(';').next().unwrap_or(subtype).trim())
        .filter(|subtype| !subtype.is_empty())
        .unwrap_or("bin");

    format!("{}.{extension}", URL_SAFE_NO_PAD.encode(random))
}

/// Places uploaded assets according to the deployment configuration
pub struct StoragePlacement {
    config: PlacementConfig,
    objects: Arc<dyn ObjectStorage>,
    registry: Arc<ThumbnailRegistry>,
}

impl StoragePlacement {
    /// Creates a placement service
    #[must_use]
    pub fn new(
        config: PlacementConfig,
        objects: Arc<dyn ObjectStorage>,
        registry: Arc<ThumbnailRegistry>,
    ) -> Self {
        tracing::info!(
            thumbnail_strategy = %config.thumbnail_strategy,
            url_form = %config.url_form,
            bucket = %config.bucket,
            "Storage placement configured"
        );

        Self {
            config,
            objects,
            registry,
        }
    }

    /// Active thumbnail strategy
    #[must_use]
    pub const fn thumbnail_strategy(&self) -> PlacementStrategy {
        self.config.thumbnail_strategy
    }

    /// Places a thumbnail for `video_id`
    ///
    /// # Errors
    ///
    /// Returns `BucketError` if the object storage upload fails
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn place_thumbnail(
        &self,
        video_id: Uuid,
        data: Bytes,
        content_type: &str,
    ) -> BucketResult<Placement> {
        match self.config.thumbnail_strategy {
            PlacementStrategy::Inline => Ok(Placement::at(data_url(content_type, &data))),
            PlacementStrategy::Registry => {
                let insertion = self
                    .registry
                    .insert(
                        video_id,
                        StoredThumbnail {
                            data,
                            content_type: content_type.to_string(),
                        },
                    )
                    .await;

                Ok(Placement {
                    location: format!(
                        "{}/api/thumbnails/{video_id}",
                        self.config.platform_base_url
                    ),
                    registry_entry: Some(insertion),
                })
            }
            PlacementStrategy::ObjectStorage => {
                let key = asset_path(content_type);
                self.objects
                    .put_object(
                        &self.config.bucket,
                        &key,
                        ObjectBody::Bytes(data),
                        content_type,
                    )
                    .await?;
                Ok(Placement::at(self.object_location(&key)))
            }
        }
    }

    /// Uploads a video file under its orientation prefix
    ///
    /// # Errors
    ///
    /// Returns `BucketError` if the object storage upload fails
    #[instrument(skip(self))]
    pub async fn place_video(
        &self,
        orientation: Orientation,
        file: &Path,
        content_type: &str,
    ) -> BucketResult<Placement> {
        let key = format!("{orientation}/{}", asset_path(content_type));

        self.objects
            .put_object(
                &self.config.bucket,
                &key,
                ObjectBody::File(file.to_path_buf()),
                content_type,
            )
            .await?;

        Ok(Placement::at(self.object_location(&key)))
    }

    /// Undoes the process-local side effect of `placement`, if it had one
    ///
    /// The previous registry entry for the video is restored, or the inserted one
    /// removed. A newer upload for the same video is left in place.
    pub async fn rollback(&self, placement: Placement) {
        let Some(insertion) = placement.registry_entry else {
            return;
        };

        let video_id = insertion.video_id();
        if self.registry.revert(insertion).await {
            warn!(%video_id, "Rolled back thumbnail registry entry");
        } else {
            debug!(%video_id, "Registry entry already replaced, nothing to roll back");
        }
    }

    /// Opens an object served under the platform URL form
    ///
    /// # Errors
    ///
    /// Returns `BucketError::ObjectNotFound` if the deployment does not use the
    /// platform form or the key is unknown, and other `BucketError`s if the
    /// download fails
    pub async fn open_asset(&self, key: &str) -> BucketResult<StoredObject> {
        if self.config.url_form != ObjectUrlForm::Platform {
            return Err(BucketError::ObjectNotFound(key.to_string()));
        }

        self.objects.get_object(&self.config.bucket, key).await
    }

    /// Turns a persisted location into one a client can fetch
    ///
    /// # Errors
    ///
    /// Returns `BucketError` if presigning fails
    pub async fn resolve(&self, location: &str) -> BucketResult<String> {
        let Some(object) = ObjectLocation::parse(location) else {
            return Ok(location.to_string());
        };

        let presigned = self
            .objects
            .presign_get(object.bucket, object.key, self.config.presign_ttl)
            .await?;

        debug!(key = object.key, expires_at = %presigned.expires_at, "Presigned object");

        Ok(presigned.url)
    }

    /// Resolves both locations of a video record
    ///
    /// # Errors
    ///
    /// Returns `BucketError` if presigning fails
    pub async fn resolve_video(&self, mut video: Video) -> BucketResult<Video> {
        if let Some(location) = video.video_url.take() {
            video.video_url = Some(self.resolve(&location).await?);
        }
        if let Some(location) = video.thumbnail_url.take() {
            video.thumbnail_url = Some(self.resolve(&location).await?);
        }
        Ok(video)
    }

    fn object_location(&self, key: &str) -> String {
        let PlacementConfig {
            bucket,
            region,
            platform_base_url,
            ..
        } = &self.config;

        match self.config.url_form {
            ObjectUrlForm::Public => format!("https://{bucket}.s3.{region}.amazonaws.com/{key}"),
            ObjectUrlForm::Presigned => format!("{bucket},{key}"),
            ObjectUrlForm::Platform => format!("{platform_base_url}/assets/{key}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStorage {
        puts: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl ObjectStorage for RecordingStorage {
        async fn put_object(
            &self,
            bucket: &str,
            key: &str,
            _body: ObjectBody,
            content_type: &str,
        ) -> BucketResult<()> {
            if self.fail {
                return Err(BucketError::S3Error("access denied".to_string()));
            }
            self.puts.lock().unwrap().push((
                bucket.to_string(),
                key.to_string(),
                content_type.to_string(),
            ));
            Ok(())
        }

        async fn get_object(&self, bucket: &str, key: &str) -> BucketResult<StoredObject> {
            let content_type = self
                .puts
                .lock()
                .unwrap()
                .iter()
                .find(|(b, k, _)| b == bucket && k == key)
                .map(|(_, _, content_type)| content_type.clone())
                .ok_or_else(|| BucketError::ObjectNotFound(key.to_string()))?;
            Ok(StoredObject {
                body: aws_sdk_s3::primitives::ByteStream::from_static(b"stored"),
                content_type: Some(content_type),
                content_length: Some(6),
            })
        }

        async fn presign_get(
            &self,
            bucket: &str,
            key: &str,
            expires_in: Duration,
        ) -> BucketResult<PresignedUrl> {
            Ok(PresignedUrl {
                url: format!(
                    "https://signed.example/{bucket}/{key}?ttl={}",
                    expires_in.as_secs()
                ),
                expires_at: chrono::Utc::now(),
            })
        }
    }

    fn placement(
        strategy: PlacementStrategy,
        url_form: ObjectUrlForm,
        storage: Arc<RecordingStorage>,
    ) -> (StoragePlacement, Arc<ThumbnailRegistry>) {
        let registry = Arc::new(ThumbnailRegistry::new());
        let placement = StoragePlacement::new(
            PlacementConfig {
                thumbnail_strategy: strategy,
                url_form,
                bucket: "tubely-media".to_string(),
                region: "eu-west-1".to_string(),
                platform_base_url: "http://localhost:8091".to_string(),
                presign_ttl: Duration::from_secs(300),
            },
            storage,
            registry.clone(),
        );
        (placement, registry)
    }

    #[test]
    fn test_data_url() {
        assert_eq!(
            data_url("image/png", b"hello"),
            "data:image/png;base64,aGVsbG8="
        );
    }

    #[test]
    fn test_asset_path_shape() {
        let path = asset_path("video/mp4");
        let (name, extension) = path.rsplit_once('.').unwrap();
        assert_eq!(extension, "mp4");
        assert_eq!(URL_SAFE_NO_PAD.decode(name).unwrap().len(), 32);

        assert!(asset_path("image/jpeg").ends_with(".jpeg"));
        assert!(asset_path("image/png; charset=binary").ends_with(".png"));
        assert!(asset_path("garbage").ends_with(".bin"));
        assert_ne!(asset_path("image/png"), asset_path("image/png"));
    }

    #[test]
    fn test_object_location_parse() {
        assert_eq!(
            ObjectLocation::parse("tubely-media,landscape/abc.mp4"),
            Some(ObjectLocation {
                bucket: "tubely-media",
                key: "landscape/abc.mp4"
            })
        );
        assert_eq!(ObjectLocation::parse("data:image/png;base64,AAAA"), None);
        assert_eq!(
            ObjectLocation::parse("https://tubely-media.s3.us-east-1.amazonaws.com/a,b"),
            None
        );
        assert_eq!(ObjectLocation::parse("no-comma"), None);
        assert_eq!(ObjectLocation::parse(",key"), None);
        assert_eq!(ObjectLocation::parse("bucket,"), None);
        assert_eq!(ObjectLocation::parse("a,b,c"), None);
    }

    #[tokio::test]
    async fn test_inline_thumbnail() {
        let storage = Arc::new(RecordingStorage::default());
        let (placement, registry) =
            placement(PlacementStrategy::Inline, ObjectUrlForm::Presigned, storage.clone());

        let placed = placement
            .place_thumbnail(Uuid::new_v4(), Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();

        assert_eq!(placed.location, "data:image/png;base64,cG5n");
        assert!(storage.puts.lock().unwrap().is_empty());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_registry_thumbnail_and_rollback() {
        let storage = Arc::new(RecordingStorage::default());
        let (placement, registry) =
            placement(PlacementStrategy::Registry, ObjectUrlForm::Presigned, storage);
        let video_id = Uuid::new_v4();

        let placed = placement
            .place_thumbnail(video_id, Bytes::from_static(b"jpg"), "image/jpeg")
            .await
            .unwrap();

        assert_eq!(
            placed.location,
            format!("http://localhost:8091/api/thumbnails/{video_id}")
        );
        assert_eq!(
            registry.get(video_id).await.unwrap().content_type,
            "image/jpeg"
        );

        placement.rollback(placed).await;
        assert!(registry.get(video_id).await.is_none());
    }

    #[tokio::test]
    async fn test_registry_rollback_restores_previous_entry() {
        let storage = Arc::new(RecordingStorage::default());
        let (placement, registry) =
            placement(PlacementStrategy::Registry, ObjectUrlForm::Presigned, storage);
        let video_id = Uuid::new_v4();

        placement
            .place_thumbnail(video_id, Bytes::from_static(b"old"), "image/png")
            .await
            .unwrap();
        let second = placement
            .place_thumbnail(video_id, Bytes::from_static(b"new"), "image/png")
            .await
            .unwrap();

        placement.rollback(second).await;

        assert_eq!(
            registry.get(video_id).await.unwrap().data,
            Bytes::from_static(b"old")
        );
    }

    #[tokio::test]
    async fn test_rollback_leaves_newer_registry_entry() {
        let storage = Arc::new(RecordingStorage::default());
        let (placement, registry) =
            placement(PlacementStrategy::Registry, ObjectUrlForm::Presigned, storage);
        let video_id = Uuid::new_v4();

        let first = placement
            .place_thumbnail(video_id, Bytes::from_static(b"first"), "image/png")
            .await
            .unwrap();
        let _second = placement
            .place_thumbnail(video_id, Bytes::from_static(b"second"), "image/png")
            .await
            .unwrap();

        // The second upload was persisted; the first one's save failing must not
        // take its thumbnail away
        placement.rollback(first).await;

        assert_eq!(
            registry.get(video_id).await.unwrap().data,
            Bytes::from_static(b"second")
        );
    }

    #[tokio::test]
    async fn test_open_asset_only_for_platform_form() {
        for (form, served) in [
            (ObjectUrlForm::Platform, true),
            (ObjectUrlForm::Presigned, false),
            (ObjectUrlForm::Public, false),
        ] {
            let storage = Arc::new(RecordingStorage::default());
            let (placement, _) =
                placement(PlacementStrategy::ObjectStorage, form, storage.clone());
            let placed = placement
                .place_video(Orientation::Landscape, Path::new("/tmp/v.mp4"), "video/mp4")
                .await
                .unwrap();
            let key = storage.puts.lock().unwrap()[0].1.clone();

            let opened = placement.open_asset(&key).await;
            assert_eq!(opened.is_ok(), served, "{form}: {}", placed.location);
            if let Ok(object) = opened {
                assert_eq!(object.content_type.as_deref(), Some("video/mp4"));
            }
        }

        let storage = Arc::new(RecordingStorage::default());
        let (placement, _) =
            placement(PlacementStrategy::ObjectStorage, ObjectUrlForm::Platform, storage);
        assert!(matches!(
            placement.open_asset("landscape/unknown.mp4").await,
            Err(BucketError::ObjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_object_storage_thumbnail_forms() {
        for (form, expected_prefix) in [
            (ObjectUrlForm::Presigned, "tubely-media,"),
            (
                ObjectUrlForm::Public,
                "https://tubely-media.s3.eu-west-1.amazonaws.com/",
            ),
            (ObjectUrlForm::Platform, "http://localhost:8091/assets/"),
        ] {
            let storage = Arc::new(RecordingStorage::default());
            let (placement, _) =
                placement(PlacementStrategy::ObjectStorage, form, storage.clone());

            let placed = placement
                .place_thumbnail(Uuid::new_v4(), Bytes::from_static(b"png"), "image/png")
                .await
                .unwrap();

            let puts = storage.puts.lock().unwrap();
            assert_eq!(puts.len(), 1);
            let (bucket, key, content_type) = &puts[0];
            assert_eq!(bucket, "tubely-media");
            assert!(!key.contains('/'), "thumbnail keys are flat: {key}");
            assert_eq!(content_type, "image/png");
            assert_eq!(placed.location, format!("{expected_prefix}{key}"));
        }
    }

    #[tokio::test]
    async fn test_video_key_is_namespaced_by_orientation() {
        let storage = Arc::new(RecordingStorage::default());
        let (placement, _) =
            placement(PlacementStrategy::Inline, ObjectUrlForm::Presigned, storage.clone());

        let placed = placement
            .place_video(Orientation::Portrait, Path::new("/tmp/v.mp4"), "video/mp4")
            .await
            .unwrap();

        let (_, key, _) = storage.puts.lock().unwrap()[0].clone();
        assert!(key.starts_with("portrait/"));
        assert!(key.ends_with(".mp4"));
        assert_eq!(placed.location, format!("tubely-media,{key}"));
    }

    #[tokio::test]
    async fn test_upload_failure_is_reported() {
        let storage = Arc::new(RecordingStorage {
            fail: true,
            ..RecordingStorage::default()
        });
        let (placement, _) =
            placement(PlacementStrategy::ObjectStorage, ObjectUrlForm::Public, storage);

        let result = placement
            .place_video(Orientation::Other, Path::new("/tmp/v.mp4"), "video/mp4")
            .await;

        assert!(matches!(result, Err(BucketError::S3Error(_))));
    }

    #[tokio::test]
    async fn test_resolve_presigns_pairs_only() {
        let storage = Arc::new(RecordingStorage::default());
        let (placement, _) =
            placement(PlacementStrategy::Inline, ObjectUrlForm::Presigned, storage);

        assert_eq!(
            placement.resolve("tubely-media,other/x.mp4").await.unwrap(),
            "https://signed.example/tubely-media/other/x.mp4?ttl=300"
        );
        assert_eq!(
            placement.resolve("data:image/png;base64,AAAA").await.unwrap(),
            "data:image/png;base64,AAAA"
        );

        let video = Video {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: String::new(),
            description: String::new(),
            thumbnail_url: None,
            video_url: Some("tubely-media,landscape/y.mp4".to_string()),
            created_at: 0,
            updated_at: 0,
        };
        let resolved = placement.resolve_video(video).await.unwrap();
        assert_eq!(
            resolved.video_url.as_deref(),
            Some("https://signed.example/tubely-media/landscape/y.mp4?ttl=300")
        );
        assert_eq!(resolved.thumbnail_url, None);
    }
}
