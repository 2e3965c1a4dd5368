use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure pulling a frame from a source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The stream could not be reached or dropped mid-read. Not recoverable.
    #[error("connection to {source_name} failed: {reason}")]
    Connection { source_name: String, reason: String },
    /// A single frame could not be decoded. The next pull may succeed.
    #[error("failed to decode frame from {origin}: {reason}")]
    Decode { origin: String, reason: String },
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl SourceError {
    /// True when the source cannot yield further frames.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SourceError::Decode { .. })
    }
}

/// The detector backend failed on a frame.
#[derive(Debug, Error)]
#[error("detection failed in backend '{backend}': {reason}")]
pub struct DetectionError {
    pub backend: &'static str,
    pub reason: String,
}

impl DetectionError {
    pub fn new(backend: &'static str, reason: impl Into<String>) -> Self {
        Self {
            backend,
            reason: reason.into(),
        }
    }
}

/// Failure persisting a capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to prepare {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to write capture image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to append to log {}: {source}", path.display())]
    Log { path: PathBuf, source: io::Error },
    #[error("failed to encode log row: {0}")]
    Encode(#[from] csv::Error),
}

/// Rejected session transitions and capture failures.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is already running")]
    AlreadyRunning,
    #[error("frame source has been released; the session has ended")]
    SourceReleased,
    #[error(transparent)]
    Capture(#[from] CaptureError),
}
