//! Video inspection and normalization through external tools
//!
//! The upload flow only talks to [`MediaPipeline`]; the tools themselves sit
//! behind the [`Inspector`] and [`Transcoder`] traits so they can be swapped
//! for fakes. Every tool invocation holds a permit from a shared semaphore, so
//! concurrent uploads queue instead of spawning unbounded processes.

mod error;
mod ffmpeg;
mod ffprobe;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use strum::{Display, EnumString};
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

pub use error::{MediaError, MediaResult};
pub use ffmpeg::FfmpegTranscoder;
pub use ffprobe::{parse_probe_output, FfprobeInspector};

/// Orientation bucket of an uploaded video, used as its storage key prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Orientation {
    /// 16:9
    Landscape,
    /// 9:16
    Portrait,
    /// Anything else, including unknown
    Other,
}

impl Orientation {
    /// Maps a display aspect ratio to an orientation; total over all inputs
    #[must_use]
    pub fn from_aspect_ratio(aspect_ratio: Option<&str>) -> Self {
        match aspect_ratio {
            Some("16:9") => Self::Landscape,
            Some("9:16") => Self::Portrait,
            _ => Self::Other,
        }
    }
}

/// What the inspector learned about a file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    /// `display_aspect_ratio` of the first stream, if any
    pub display_aspect_ratio: Option<String>,
}

/// Reads stream metadata from a media file
#[async_trait]
pub trait Inspector: Send + Sync {
    /// Inspects the file at `path`
    async fn probe(&self, path: &Path) -> MediaResult<ProbeReport>;
}

/// Rewrites a media file for progressive playback
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Writes a fast-start copy of `input` to a sibling path
    async fn faststart(&self, input: &Path) -> MediaResult<ProcessedFile>;
}

/// Output of the transcoder; the file is removed when this guard is dropped
#[derive(Debug)]
pub struct ProcessedFile {
    path: PathBuf,
}

impl ProcessedFile {
    /// Takes ownership of `path`, whether or not the file exists yet
    #[must_use]
    pub const fn claim(path: PathBuf) -> Self {
        Self { path }
    }

    /// Sibling path the transcoder writes to for `input`
    #[must_use]
    pub fn sibling_of(input: &Path) -> PathBuf {
        let mut name = input.as_os_str().to_owned();
        name.push(".processing");
        PathBuf::from(name)
    }

    /// Location of the processed file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProcessedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed processed file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "Failed to remove processed file: {e}"),
        }
    }
}

/// Bounded front-end over the inspector and transcoder
pub struct MediaPipeline {
    inspector: Arc<dyn Inspector>,
    transcoder: Arc<dyn Transcoder>,
    permits: Arc<Semaphore>,
}

impl MediaPipeline {
    /// Creates a pipeline allowing `max_concurrent_jobs` tool processes at once
    #[must_use]
    pub fn new(
        inspector: Arc<dyn Inspector>,
        transcoder: Arc<dyn Transcoder>,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            inspector,
            transcoder,
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    /// Inspects `path` and buckets it by aspect ratio
    ///
    /// # Errors
    ///
    /// Returns `MediaError` if the inspector fails or its output is malformed
    #[instrument(skip(self))]
    pub async fn classify(&self, path: &Path) -> MediaResult<Orientation> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| MediaError::QueueClosed)?;

        let report = self.inspector.probe(path).await?;
        let orientation = Orientation::from_aspect_ratio(report.display_aspect_ratio.as_deref());

        debug!(
            aspect_ratio = ?report.display_aspect_ratio,
            %orientation,
            "Classified video"
        );

        Ok(orientation)
    }

    /// Produces a fast-start copy of `path`
    ///
    /// # Errors
    ///
    /// Returns `MediaError` if the transcoder fails or its output is missing or empty
    #[instrument(skip(self))]
    pub async fn normalize(&self, path: &Path) -> MediaResult<ProcessedFile> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| MediaError::QueueClosed)?;

        self.transcoder.faststart(path).await
    }
}
