#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::labels::LabelMap;
use crate::detect::result::Detection;
use crate::detect::yolo::{self, InputGeometry};
use crate::error::DetectionError;
use crate::frame::Frame;

/// Tract-based backend for ONNX YOLO models.
///
/// Loads a local model file once and runs it on RGB frames resized to the
/// model's square input.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    labels: LabelMap,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32, labels: LabelMap) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(0, f32::fact([1, 3, side, side]).into())
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size,
            labels,
        })
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let side = self.input_size;
        let resized = imageops::resize(frame.image(), side, side, FilterType::Triangle);
        let side = side as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, channel, y, x)| {
            resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0
        });
        input.into_tensor()
    }

    fn run(&self, frame: &Frame) -> Result<Vec<Detection>> {
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let head = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        let shape = head.shape().to_vec();
        let (channels, proposals) = match shape.as_slice() {
            [1, channels, proposals] => (*channels, *proposals),
            other => return Err(anyhow!("unexpected model output shape {:?}", other)),
        };
        let data: Vec<f32> = head.iter().copied().collect();

        yolo::decode(
            &data,
            channels,
            proposals,
            InputGeometry {
                input_size: self.input_size,
                frame_width: frame.width(),
                frame_height: frame.height(),
            },
            &self.labels,
        )
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        self.run(frame)
            .map_err(|e| DetectionError::new(self.name(), format!("{e:#}")))
    }

    fn warm_up(&mut self) -> Result<(), DetectionError> {
        let blank = Frame::new(image::RgbImage::new(self.input_size, self.input_size));
        self.detect(&blank).map(|_| ())
    }
}
