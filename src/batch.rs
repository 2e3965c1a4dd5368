//! Folder mode: annotate every image in a directory.
//!
//! Each frame is detected, annotated and written to the output directory as
//! `detection_<file name>`. Frames that fail to decode or detect are skipped;
//! a failed write aborts the run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::annotate::Annotator;
use crate::detect::DetectorBackend;
use crate::ingest::FrameSource;

pub const OUTPUT_PREFIX: &str = "detection_";
pub const COMPLETION_MESSAGE: &str = "Object detection on dataset images is complete.";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub total_bottles: usize,
    pub outputs: Vec<PathBuf>,
}

/// Run detection over every frame of `source`, reporting one line per frame.
pub fn run_batch<S, D>(
    source: &mut S,
    detector: &mut D,
    annotator: &Annotator,
    output_dir: &Path,
    mut report: impl FnMut(&str),
) -> Result<BatchSummary>
where
    S: FrameSource,
    D: DetectorBackend,
{
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output folder {}", output_dir.display()))?;

    let mut summary = BatchSummary::default();
    let mut index = 0usize;
    loop {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) if e.is_fatal() => {
                return Err(e).with_context(|| format!("batch aborted on {}", source.describe()))
            }
            Err(e) => {
                log::warn!("skipping image: {}", e);
                summary.skipped += 1;
                continue;
            }
        };
        index += 1;

        let detections = match detector.detect(&frame) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!(
                    "skipping {}: {}",
                    frame.file_name.as_deref().unwrap_or("frame"),
                    e
                );
                summary.skipped += 1;
                continue;
            }
        };

        let annotation = annotator.annotate(&frame, &detections);
        let file_name = frame
            .file_name
            .clone()
            .unwrap_or_else(|| format!("frame_{index:05}.jpg"));
        let output_path = output_dir.join(format!("{OUTPUT_PREFIX}{file_name}"));
        annotation
            .frame
            .image()
            .save(&output_path)
            .with_context(|| format!("failed to write {}", output_path.display()))?;

        report(&format!(
            "Processed and saved: {} - Bottles counted: {}",
            output_path.display(),
            annotation.count
        ));
        summary.processed += 1;
        summary.total_bottles += annotation.count;
        summary.outputs.push(output_path);
    }

    report(COMPLETION_MESSAGE);
    log::info!(
        "batch finished: {} processed, {} skipped, {} bottle(s)",
        summary.processed,
        summary.skipped,
        summary.total_bottles
    );
    Ok(summary)
}
