//! Post-processing for YOLOv8-style detection heads.
//!
//! The head emits `[1, 4 + classes, proposals]`: rows 0..4 are the box centre
//! and size in model-input pixels, the remaining rows are per-class scores.

use anyhow::{anyhow, Result};

use crate::detect::labels::LabelMap;
use crate::detect::result::{BoundingBox, Detection};

/// Candidates below this score never leave the model adapter.
pub const CANDIDATE_FLOOR: f32 = 0.25;
/// Overlap above which a lower-scoring box of the same class is suppressed.
pub const NMS_IOU: f32 = 0.7;

/// Geometry needed to map model-input coordinates back onto the frame.
#[derive(Clone, Copy, Debug)]
pub struct InputGeometry {
    pub input_size: u32,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl InputGeometry {
    fn scale_x(&self) -> f32 {
        self.frame_width as f32 / self.input_size as f32
    }

    fn scale_y(&self) -> f32 {
        self.frame_height as f32 / self.input_size as f32
    }
}

/// Decode a flattened head output into detections, highest score first.
pub fn decode(
    data: &[f32],
    channels: usize,
    proposals: usize,
    geometry: InputGeometry,
    labels: &LabelMap,
) -> Result<Vec<Detection>> {
    if channels <= 4 {
        return Err(anyhow!("model head has {} rows; expected at least 5", channels));
    }
    let expected = channels
        .checked_mul(proposals)
        .ok_or_else(|| anyhow!("model head dimensions overflow"))?;
    if data.len() != expected {
        return Err(anyhow!(
            "model head length mismatch: expected {}, got {}",
            expected,
            data.len()
        ));
    }

    let classes = channels - 4;
    let at = |row: usize, i: usize| data[row * proposals + i];
    let fw = geometry.frame_width as f32;
    let fh = geometry.frame_height as f32;

    let mut candidates = Vec::new();
    for i in 0..proposals {
        let (class_id, score) = (0..classes)
            .map(|c| (c, at(4 + c, i)))
            .fold((0, f32::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });
        if !score.is_finite() || score < CANDIDATE_FLOOR {
            continue;
        }

        let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
        let bbox = BoundingBox::new(
            ((cx - w / 2.0) * geometry.scale_x()).clamp(0.0, fw),
            ((cy - h / 2.0) * geometry.scale_y()).clamp(0.0, fh),
            ((cx + w / 2.0) * geometry.scale_x()).clamp(0.0, fw),
            ((cy + h / 2.0) * geometry.scale_y()).clamp(0.0, fh),
        );
        candidates.push(Detection::new(labels.resolve(class_id), class_id, score, bbox));
    }

    Ok(nms(candidates, NMS_IOU))
}

/// Greedy per-class NMS: sort by confidence, suppress same-class overlaps.
pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let overlaps = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}
