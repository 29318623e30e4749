use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::instrument;

use super::{MediaError, MediaResult, ProcessedFile, Transcoder};

const TOOL: &str = "ffmpeg";

/// [`Transcoder`] backed by the `ffmpeg` executable
///
/// Remuxes the input with `-movflags faststart` and `-codec copy`, so the
/// `moov` atom moves to the front without re-encoding any stream.
pub struct FfmpegTranscoder {
    program: String,
}

impl FfmpegTranscoder {
    /// Creates a transcoder running `program` (usually `ffmpeg`)
    #[must_use]
    pub const fn new(program: String) -> Self {
        Self { program }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    #[instrument(skip(self), fields(process.executable.name = TOOL, process.executable.path = %self.program))]
    async fn faststart(&self, input: &Path) -> MediaResult<ProcessedFile> {
        let start = std::time::Instant::now();

        // Claimed before running so a partial output is removed on every failure path
        let processed = ProcessedFile::claim(ProcessedFile::sibling_of(input));

        let output = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-movflags", "faststart", "-codec", "copy", "-f", "mp4"])
            .arg(processed.path())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| MediaError::Spawn { tool: TOOL, source })?;

        if !output.status.success() {
            return Err(MediaError::ToolFailed {
                tool: TOOL,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let metadata = tokio::fs::metadata(processed.path())
            .await
            .map_err(|_| MediaError::MissingOutput(processed.path().to_path_buf()))?;
        if metadata.len() == 0 {
            return Err(MediaError::EmptyOutput);
        }

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            size = metadata.len(),
            "Faststart optimization complete"
        );

        Ok(processed)
    }
}
