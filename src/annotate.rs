//! Frame annotation.
//!
//! `Annotator::annotate` is pure: it copies the frame, draws one box and
//! label per counted detection plus the running total, and returns the copy.
//! Text is rendered when a font is loaded; otherwise each label becomes a
//! solid bar and the total is drawn as tally marks.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::detect::{counted, BoundingBox, Detection};
use crate::frame::Frame;

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const LABEL_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const OVERLAY_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

const BOX_THICKNESS: u32 = 2;
const LABEL_SCALE: f32 = 14.0;
const OVERLAY_SCALE: f32 = 28.0;
// Top-left of the overlay glyphs; at OVERLAY_SCALE the baseline lands near y = 30.
const OVERLAY_ORIGIN: (i32, i32) = (10, 8);
const TALLY_SIZE: u32 = 6;
const TALLY_STEP: i32 = 9;
const TALLY_TOP: i32 = 24;

/// Text overlaid on every annotated frame.
pub fn overlay_text(count: usize) -> String {
    format!("Total Bottles: {count}")
}

/// An annotated copy of a frame and what was drawn on it.
#[derive(Clone, Debug)]
pub struct Annotation {
    pub frame: Frame,
    /// Detections that passed `counted`.
    pub count: usize,
    /// Rectangles actually drawn; equals `count` unless the frame is empty.
    pub boxes_drawn: usize,
    pub labels: Vec<String>,
    pub overlay: String,
}

#[derive(Default)]
pub struct Annotator {
    font: Option<FontVec>,
}

impl Annotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(font: FontVec) -> Self {
        Self { font: Some(font) }
    }

    /// Load a TrueType/OpenType font for label and overlay text.
    pub fn from_font_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read font {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .with_context(|| format!("invalid font file {}", path.display()))?;
        Ok(Self::with_font(font))
    }

    pub fn annotate(&self, frame: &Frame, detections: &[Detection]) -> Annotation {
        let mut canvas = frame.image().clone();
        let kept = counted(detections);

        let boxes_drawn = kept
            .iter()
            .filter(|detection| self.draw_detection(&mut canvas, detection))
            .count();

        let count = kept.len();
        let overlay = overlay_text(count);
        if canvas.width() > 0 && canvas.height() > 0 {
            self.draw_overlay(&mut canvas, &overlay, count);
        }

        Annotation {
            frame: frame.replaced(canvas),
            count,
            boxes_drawn,
            labels: kept.iter().map(|d| d.label.clone()).collect(),
            overlay,
        }
    }

    /// Draw one box and its label. Returns false when nothing could be drawn.
    fn draw_detection(&self, canvas: &mut RgbImage, detection: &Detection) -> bool {
        let Some(area) = PixelRect::clip(&detection.bbox, canvas.width(), canvas.height()) else {
            return false;
        };
        let (x, y) = (area.x as i32, area.y as i32);

        for inset in 0..BOX_THICKNESS {
            let shrink = inset * 2;
            if area.width <= shrink || area.height <= shrink {
                break;
            }
            let rect = Rect::at(x + inset as i32, y + inset as i32)
                .of_size(area.width - shrink, area.height - shrink);
            draw_hollow_rect_mut(canvas, rect, BOX_COLOR);
        }

        let label_y = area.y.saturating_sub(LABEL_SCALE as u32) as i32;
        match &self.font {
            Some(font) => draw_text_mut(
                canvas,
                LABEL_COLOR,
                x,
                label_y,
                PxScale::from(LABEL_SCALE),
                font,
                &detection.label,
            ),
            None => {
                let bar_width = (detection.label.chars().count() as u32)
                    .saturating_mul(6)
                    .clamp(6, canvas.width().max(6));
                let bar = Rect::at(x, area.y.saturating_sub(6) as i32).of_size(bar_width, 4);
                draw_filled_rect_mut(canvas, bar, LABEL_COLOR);
            }
        }
        true
    }

    fn draw_overlay(&self, canvas: &mut RgbImage, overlay: &str, count: usize) {
        match &self.font {
            Some(font) => draw_text_mut(
                canvas,
                OVERLAY_COLOR,
                OVERLAY_ORIGIN.0,
                OVERLAY_ORIGIN.1,
                PxScale::from(OVERLAY_SCALE),
                font,
                overlay,
            ),
            None => {
                let fits = ((canvas.width() as i32 - OVERLAY_ORIGIN.0) / TALLY_STEP).max(0) as usize;
                for i in 0..count.min(fits) {
                    let mark = Rect::at(OVERLAY_ORIGIN.0 + i as i32 * TALLY_STEP, TALLY_TOP)
                        .of_size(TALLY_SIZE, TALLY_SIZE);
                    draw_filled_rect_mut(canvas, mark, OVERLAY_COLOR);
                }
            }
        }
    }
}

/// A detection box clipped to the canvas, in whole pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PixelRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl PixelRect {
    /// Clip in f32 before any integer conversion. Boxes lying fully outside
    /// the canvas collapse onto its nearest edge, at least one pixel wide.
    fn clip(bbox: &BoundingBox, canvas_width: u32, canvas_height: u32) -> Option<Self> {
        if canvas_width == 0 || canvas_height == 0 {
            return None;
        }
        let (x, width) = clip_axis(bbox.x1, bbox.x2, canvas_width);
        let (y, height) = clip_axis(bbox.y1, bbox.y2, canvas_height);
        Some(Self {
            x,
            y,
            width,
            height,
        })
    }
}

fn clip_axis(start: f32, end: f32, limit: u32) -> (u32, u32) {
    let last = (limit - 1) as f32;
    let origin = start.clamp(0.0, last).floor() as u32;
    let end = end.clamp(0.0, limit as f32).round() as u32;
    let extent = end.saturating_sub(origin).clamp(1, limit - origin);
    (origin, extent)
}
