//! Capture logging.
//!
//! A capture saves the annotated frame under the capture directory and
//! appends one row to the CSV log. The log is append-only: it is created with
//! a header row when missing or empty, and existing rows are never rewritten.
//! Each row is encoded in full before a single append, so a failed write
//! leaves no partial row behind.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::detect::{counted_labels, Detection};
use crate::error::CaptureError;
use crate::frame::Frame;

/// Column order of the capture log.
pub const LOG_HEADER: [&str; 4] = ["Image Filename", "Timestamp", "Total Count", "Bottle Names"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One row of the capture log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureRecord {
    pub image_path: PathBuf,
    pub timestamp: String,
    pub total_count: usize,
    pub labels: Vec<String>,
}

impl CaptureRecord {
    /// Label list as written to the log.
    pub fn label_list(&self) -> String {
        self.labels.join(", ")
    }

    fn to_row(&self) -> [String; 4] {
        [
            self.image_path.display().to_string(),
            self.timestamp.clone(),
            self.total_count.to_string(),
            self.label_list(),
        ]
    }
}

pub struct CaptureLogger {
    image_dir: PathBuf,
    log_path: PathBuf,
}

impl CaptureLogger {
    pub fn new(image_dir: impl Into<PathBuf>, log_path: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
            log_path: log_path.into(),
        }
    }

    /// Persist an annotated frame and append its log row, stamped now.
    pub fn log_capture(
        &self,
        frame: &Frame,
        detections: &[Detection],
    ) -> Result<CaptureRecord, CaptureError> {
        self.log_capture_at(frame, detections, Local::now())
    }

    /// Same as `log_capture` with an explicit capture time.
    pub fn log_capture_at(
        &self,
        frame: &Frame,
        detections: &[Detection],
        at: DateTime<Local>,
    ) -> Result<CaptureRecord, CaptureError> {
        fs::create_dir_all(&self.image_dir).map_err(|source| CaptureError::Io {
            path: self.image_dir.clone(),
            source,
        })?;

        let labels = counted_labels(detections);
        let image_path = self.unique_image_path(&at);
        frame
            .image()
            .save(&image_path)
            .map_err(|source| CaptureError::Image {
                path: image_path.clone(),
                source,
            })?;

        let record = CaptureRecord {
            image_path,
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            total_count: labels.len(),
            labels,
        };

        if let Err(err) = self.append_row(&record) {
            if let Err(cleanup) = fs::remove_file(&record.image_path) {
                log::warn!(
                    "failed to remove orphaned capture {}: {}",
                    record.image_path.display(),
                    cleanup
                );
            }
            return Err(err);
        }

        log::info!(
            "capture saved: {} ({} bottle(s))",
            record.image_path.display(),
            record.total_count
        );
        Ok(record)
    }

    /// `capture_<stamp>.jpg`, or `capture_<stamp>_<n>.jpg` if that is taken.
    fn unique_image_path(&self, at: &DateTime<Local>) -> PathBuf {
        let stamp = at.format(FILE_STAMP_FORMAT).to_string();
        let first = self.image_dir.join(format!("capture_{stamp}.jpg"));
        if !first.exists() {
            return first;
        }
        (1u32..)
            .map(|n| self.image_dir.join(format!("capture_{stamp}_{n}.jpg")))
            .find(|candidate| !candidate.exists())
            .unwrap_or(first)
    }

    fn append_row(&self, record: &CaptureRecord) -> Result<(), CaptureError> {
        let log_error = |source| CaptureError::Log {
            path: self.log_path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.log_path)
            .map_err(log_error)?;

        let (is_empty, needs_newline) = tail_state(&mut file).map_err(log_error)?;

        let mut buf = Vec::new();
        if needs_newline {
            buf.push(b'\n');
        }
        {
            let mut writer = csv::Writer::from_writer(&mut buf);
            if is_empty {
                writer.write_record(LOG_HEADER)?;
            }
            writer.write_record(record.to_row())?;
            writer.flush().map_err(log_error)?;
        }

        file.write_all(&buf).map_err(log_error)?;
        file.sync_data().map_err(log_error)?;
        Ok(())
    }
}

/// Whether the log is empty, and whether its last byte is not a newline.
fn tail_state(file: &mut File) -> std::io::Result<(bool, bool)> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok((true, false));
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok((false, last[0] != b'\n'))
}
