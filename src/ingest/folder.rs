//! Folder frame source.
//!
//! Lists the directory once, at construction, keeping `.png`, `.jpg` and
//! `.jpeg` files (any case) in file-name order. Re-running means building a
//! new source; a source cannot be rewound mid-run.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use super::FrameSource;
use crate::error::SourceError;
use crate::frame::Frame;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub struct FolderSource {
    dir: PathBuf,
    pending: VecDeque<PathBuf>,
    total: usize,
}

impl FolderSource {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, SourceError> {
        let dir = dir.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&dir).map_err(|source| SourceError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SourceError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && is_image_file(&path) {
                files.push(path);
            }
        }
        files.sort();

        log::info!("folder {}: {} image(s) queued", dir.display(), files.len());
        Ok(Self {
            dir,
            total: files.len(),
            pending: files.into(),
        })
    }

    /// Number of matching files found when the folder was opened.
    pub fn total(&self) -> usize {
        self.total
    }
}

impl FrameSource for FolderSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let image = image::open(&path).map_err(|e| SourceError::Decode {
            origin: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(Frame::new(image.into_rgb8()).with_file_name(file_name)))
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
