//! Error types for external media tools

use std::path::PathBuf;

use thiserror::Error;

/// Result type for media operations
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors raised while inspecting or normalizing an uploaded video
#[derive(Error, Debug)]
pub enum MediaError {
    /// The tool could not be started
    #[error("Failed to run {tool}: {source}")]
    Spawn {
        /// Tool name
        tool: &'static str,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The tool exited with a non-zero status
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        /// Tool name
        tool: &'static str,
        /// Exit status as reported by the OS
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// The inspection output was not the expected JSON
    #[error("Could not parse ffprobe output: {0}")]
    MalformedOutput(#[from] serde_json::Error),

    /// The transcoder reported success but wrote nothing
    #[error("Processed file is missing: {}", .0.display())]
    MissingOutput(PathBuf),

    /// The transcoder wrote a zero-length file
    #[error("Processed file is empty")]
    EmptyOutput,

    /// The media job limiter was shut down
    #[error("Media job queue is closed")]
    QueueClosed,
}
