// Error types for the playback engine

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the engine's control operations.
///
/// Decode errors that happen on the render path are logged and turned into
/// silence instead; only the control context ever sees these values.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Output device could not be opened, configured or started
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    /// File extension does not map to a supported codec
    #[error("Unsupported audio format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// File is missing, unreadable or not a valid stream of the claimed format
    #[error("Failed to open {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    /// Native decoder failure
    #[error("Decode error: {0}")]
    Decode(String),

    /// Native seek failure
    #[error("Seek failed: {0}")]
    Seek(String),

    /// Operation requires an active (playing or paused) stream
    #[error("No stream is playing")]
    NotPlaying,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn open(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Self::Open {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
