//! Where annotated frames and notices go.
//!
//! The session talks to a `FrameDisplay` only, so any toolkit (or none) can
//! sit behind it. `PreviewDisplay` keeps a preview image on disk, refreshed
//! every cycle, and drives the live count readout on stderr.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};

use crate::frame::{Frame, PREVIEW_HEIGHT, PREVIEW_WIDTH};
use crate::ui::{StatusLine, Ui};

/// A message the user must see, e.g. a saved capture or a failed log write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Info { title: String, body: String },
    Error { title: String, body: String },
}

impl Notice {
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Notice::Info {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Notice::Error {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Live readout text shown next to the preview.
pub fn count_readout(count: usize) -> String {
    format!("Bottles Placed: {count}")
}

pub trait FrameDisplay {
    /// Present one cycle's frame, its count and whether capture is enabled.
    fn show(&mut self, frame: &Frame, count: usize, capture_enabled: bool) -> Result<()>;

    /// Surface a notice to the user.
    fn notify(&mut self, notice: Notice);
}

pub struct PreviewDisplay {
    preview_path: Option<PathBuf>,
    status: StatusLine,
}

impl PreviewDisplay {
    pub fn new(ui: &Ui, preview_path: Option<PathBuf>) -> Self {
        Self {
            preview_path,
            status: ui.status(&count_readout(0)),
        }
    }

    fn write_preview(path: &Path, frame: &Frame) -> Result<()> {
        let resized = imageops::resize(
            frame.image(),
            PREVIEW_WIDTH,
            PREVIEW_HEIGHT,
            FilterType::Lanczos3,
        );
        // Write beside the target and rename so viewers never read a torn file.
        let partial = partial_path(path);
        resized
            .save(&partial)
            .with_context(|| format!("failed to write preview {}", partial.display()))?;
        std::fs::rename(&partial, path)
            .with_context(|| format!("failed to publish preview {}", path.display()))?;
        Ok(())
    }
}

impl FrameDisplay for PreviewDisplay {
    fn show(&mut self, frame: &Frame, count: usize, capture_enabled: bool) -> Result<()> {
        if let Some(path) = &self.preview_path {
            Self::write_preview(path, frame)?;
        }
        let readout = if capture_enabled {
            format!("{}  [capture ready]", count_readout(count))
        } else {
            count_readout(count)
        };
        self.status.set(&readout);
        Ok(())
    }

    fn notify(&mut self, notice: Notice) {
        match notice {
            Notice::Info { title, body } => {
                log::info!("{title}: {}", body.replace('\n', "; "));
                self.status.println(&format!("{title}\n{body}"));
            }
            Notice::Error { title, body } => {
                log::error!("{title}: {}", body.replace('\n', "; "));
                self.status.println(&format!("ERROR: {title}\n{body}"));
            }
        }
    }
}

/// `preview.jpg` -> `preview.partial.jpg`, keeping the encoder's extension.
fn partial_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "preview".to_string());
    let name = match path.extension() {
        Some(ext) => format!("{stem}.partial.{}", ext.to_string_lossy()),
        None => format!("{stem}.partial"),
    };
    path.with_file_name(name)
}
