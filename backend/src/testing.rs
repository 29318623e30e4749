//! In-memory fakes of the external capabilities, for tests

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use backend_storage::video::{
    Video, VideoCreateRequest, VideoStorageError, VideoStorageResult, VideoStore,
};
use uuid::Uuid;

use crate::{
    media::{Inspector, MediaError, MediaResult, ProbeReport, ProcessedFile, Transcoder},
    placement::{
        BucketError, BucketResult, ObjectBody, ObjectStorage, PresignedUrl, StoredObject,
    },
};

/// [`VideoStore`] backed by a map
#[derive(Debug, Default)]
pub struct MemoryVideoStore {
    videos: Mutex<HashMap<Uuid, Video>>,
    fail_updates: AtomicBool,
}

impl MemoryVideoStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record owned by `user_id` and returns it
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned
    pub fn seed(&self, user_id: Uuid) -> Video {
        let now = chrono::Utc::now().timestamp();
        let video = Video {
            id: Uuid::new_v4(),
            user_id,
            title: "Boots on the ground".to_string(),
            description: "A short clip".to_string(),
            thumbnail_url: None,
            video_url: None,
            created_at: now,
            updated_at: now,
        };
        self.videos
            .lock()
            .unwrap()
            .insert(video.id, video.clone());
        video
    }

    /// Makes every following `update` fail
    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    /// Returns the stored record
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned
    #[must_use]
    pub fn stored(&self, id: Uuid) -> Option<Video> {
        self.videos.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn create(&self, request: VideoCreateRequest) -> VideoStorageResult<Video> {
        let now = chrono::Utc::now().timestamp();
        let video = Video {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            title: request.title,
            description: request.description,
            thumbnail_url: None,
            video_url: None,
            created_at: now,
            updated_at: now,
        };
        self.videos
            .lock()
            .unwrap()
            .insert(video.id, video.clone());
        Ok(video)
    }

    async fn get(&self, id: Uuid) -> VideoStorageResult<Option<Video>> {
        Ok(self.stored(id))
    }

    async fn update(&self, video: &Video) -> VideoStorageResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(VideoStorageError::Unavailable(
                "update rejected by test store".to_string(),
            ));
        }

        let mut videos = self.videos.lock().unwrap();
        let slot = videos
            .get_mut(&video.id)
            .ok_or(VideoStorageError::VideoNotFound(video.id))?;
        *slot = video.clone();
        Ok(())
    }

    async fn list_by_owner(&self, user_id: Uuid) -> VideoStorageResult<Vec<Video>> {
        let mut videos: Vec<Video> = self
            .videos
            .lock()
            .unwrap()
            .values()
            .filter(|video| video.user_id == user_id)
            .cloned()
            .collect();
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(videos)
    }
}

/// An upload seen by [`MemoryObjectStorage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPut {
    /// Target bucket
    pub bucket: String,
    /// Object key
    pub key: String,
    /// Declared content type
    pub content_type: String,
    /// Body contents at upload time
    pub body: Vec<u8>,
}

/// [`ObjectStorage`] that records uploads, serves them back and presigns with
/// a fake host
#[derive(Debug, Default)]
pub struct MemoryObjectStorage {
    puts: Mutex<Vec<RecordedPut>>,
    fail_puts: AtomicBool,
}

impl MemoryObjectStorage {
    /// Creates an empty storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `put_object` fail
    pub fn fail_puts(&self) {
        self.fail_puts.store(true, Ordering::SeqCst);
    }

    /// Uploads recorded so far
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned
    #[must_use]
    pub fn puts(&self) -> Vec<RecordedPut> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ObjectBody,
        content_type: &str,
    ) -> BucketResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(BucketError::S3Error("put rejected by test storage".to_string()));
        }

        let body = match body {
            ObjectBody::Bytes(bytes) => bytes.to_vec(),
            ObjectBody::File(path) => tokio::fs::read(&path)
                .await
                .map_err(|e| BucketError::BodyReadError(e.to_string()))?,
        };

        self.puts.lock().unwrap().push(RecordedPut {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            body,
        });
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> BucketResult<StoredObject> {
        let put = self
            .puts
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|put| put.bucket == bucket && put.key == key)
            .cloned()
            .ok_or_else(|| BucketError::ObjectNotFound(format!("{bucket}/{key}")))?;

        Ok(StoredObject {
            content_length: i64::try_from(put.body.len()).ok(),
            content_type: Some(put.content_type),
            body: ByteStream::from(put.body),
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
                "https://presigned.test/{bucket}/{key}?X-Amz-Expires={}",
                expires_in.as_secs()
            ),
            expires_at: chrono::Utc::now() + expires_in,
        })
    }
}

/// [`Inspector`] returning a fixed aspect ratio
#[derive(Debug, Default)]
pub struct FakeInspector {
    aspect_ratio: Option<String>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeInspector {
    /// Reports `aspect_ratio` for every file
    #[must_use]
    pub fn reporting(aspect_ratio: &str) -> Self {
        Self {
            aspect_ratio: Some(aspect_ratio.to_string()),
            ..Self::default()
        }
    }

    /// Fails every probe as a crashed tool would
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of probes run
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Inspector for FakeInspector {
    async fn probe(&self, path: &Path) -> MediaResult<ProbeReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MediaError::ToolFailed {
                tool: "ffprobe",
                status: "exit status: 1".to_string(),
                stderr: format!("{}: Invalid data found", path.display()),
            });
        }
        Ok(ProbeReport {
            display_aspect_ratio: self.aspect_ratio.clone(),
        })
    }
}

/// [`Transcoder`] copying its input to the sibling path
#[derive(Debug, Default)]
pub struct FakeTranscoder {
    fail: bool,
    calls: AtomicUsize,
}

impl FakeTranscoder {
    /// Creates a transcoder that copies its input
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a partial output then fails
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of runs
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn faststart(&self, input: &Path) -> MediaResult<ProcessedFile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let processed = ProcessedFile::claim(ProcessedFile::sibling_of(input));

        if self.fail {
            let _ = tokio::fs::write(processed.path(), b"partial").await;
            return Err(MediaError::EmptyOutput);
        }

        tokio::fs::copy(input, processed.path())
            .await
            .map_err(|_| MediaError::MissingOutput(processed.path().to_path_buf()))?;
        Ok(processed)
    }
}
