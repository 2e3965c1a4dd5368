//! Frames flowing through a session.
//!
//! A `Frame` is owned by whoever pulled it from a source for the length of one
//! cycle. Annotation produces a new image; the original pixels are never
//! modified in place.

use chrono::{DateTime, Local};
use image::RgbImage;

/// Display size used by the live preview.
pub const PREVIEW_WIDTH: u32 = 640;
pub const PREVIEW_HEIGHT: u32 = 480;

/// One image pulled from a camera or loaded from disk.
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,
    /// File name the frame was read from (folder sources only).
    pub file_name: Option<String>,
    /// Wall-clock time the frame was pulled.
    pub captured_at: DateTime<Local>,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            file_name: None,
            captured_at: Local::now(),
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Packed RGB24 pixels, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// A new frame with different pixels and the same origin metadata.
    pub fn replaced(&self, image: RgbImage) -> Self {
        Self {
            image,
            file_name: self.file_name.clone(),
            captured_at: self.captured_at,
        }
    }
}
