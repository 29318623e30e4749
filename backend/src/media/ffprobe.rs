use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::instrument;

use super::{Inspector, MediaError, MediaResult, ProbeReport};

const TOOL: &str = "ffprobe";

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    display_aspect_ratio: Option<String>,
}

/// Parses `ffprobe -print_format json -show_streams` output
///
/// A missing stream list or aspect ratio is not an error; it simply yields no ratio.
///
/// # Errors
///
/// Returns `MediaError::MalformedOutput` if `stdout` is not JSON of the expected shape
pub fn parse_probe_output(stdout: &[u8]) -> MediaResult<ProbeReport> {
    let output: ProbeOutput = serde_json::from_slice(stdout)?;

    Ok(ProbeReport {
        display_aspect_ratio: output
            .streams
            .into_iter()
            .next()
            .and_then(|stream| stream.display_aspect_ratio),
    })
}

/// [`Inspector`] backed by the `ffprobe` executable
pub struct FfprobeInspector {
    program: String,
}

impl FfprobeInspector {
    /// Creates an inspector running `program` (usually `ffprobe`)
    #[must_use]
    pub const fn new(program: String) -> Self {
        Self { program }
    }
}

#[async_trait]
impl Inspector for FfprobeInspector {
    #[instrument(skip(self), fields(process.executable.name = TOOL, process.executable.path = %self.program))]
    async fn probe(&self, path: &Path) -> MediaResult<ProbeReport> {
        let start = std::time::Instant::now();

        let output = Command::new(&self.program)
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path)
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

        let report = parse_probe_output(&output.stdout)?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            aspect_ratio = ?report.display_aspect_ratio,
            "Video probe completed"
        );

        Ok(report)
    }
}
