//! Frame sources.
//!
//! - `CameraSource`: network camera streaming MJPEG/JPEG over HTTP, or a
//!   synthetic `stub://` camera for tests and demos. Never ends on its own.
//! - `FolderSource`: every image in a directory, once, in file-name order.
//!
//! Sources hand out owned `Frame`s; they keep nothing after the handoff.

pub mod camera;
pub mod folder;

use crate::error::SourceError;
use crate::frame::Frame;

pub use camera::{CameraConfig, CameraSource, CameraStats};
pub use folder::FolderSource;

/// Anything that yields frames on demand.
pub trait FrameSource {
    /// Pull the next frame. `Ok(None)` marks end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;

    /// Human-readable origin for logs.
    fn describe(&self) -> String;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        (**self).next_frame()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
