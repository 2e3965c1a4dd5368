mod backend;
mod backends;
mod labels;
mod result;
pub mod yolo;

use anyhow::{anyhow, Result};

use crate::config::{BackendKind, DetectorSettings};

pub use backend::DetectorBackend;
pub use backends::{StubBackend, StubResponse};
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use labels::{LabelMap, DEFAULT_BOTTLE_CLASSES};
pub use result::{counted, counted_labels, BoundingBox, Detection, CONFIDENCE_THRESHOLD};

/// Build the configured detector backend.
pub fn build_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    let labels = match &settings.labels_path {
        Some(path) => LabelMap::from_file(path)?,
        None => LabelMap::default(),
    };
    match settings.backend {
        BackendKind::Stub => {
            log::warn!("no model configured; using the stub backend (reports no bottles)");
            Ok(Box::new(StubBackend::new()))
        }
        BackendKind::Tract => build_tract(settings, labels),
    }
}

#[cfg(feature = "backend-tract")]
fn build_tract(settings: &DetectorSettings, labels: LabelMap) -> Result<Box<dyn DetectorBackend>> {
    let model_path = settings
        .model_path
        .as_ref()
        .ok_or_else(|| anyhow!("tract backend requires a model path"))?;
    log::info!(
        "loading model {} ({} classes, input {}px)",
        model_path.display(),
        labels.len(),
        settings.input_size
    );
    Ok(Box::new(TractBackend::new(
        model_path,
        settings.input_size,
        labels,
    )?))
}

#[cfg(not(feature = "backend-tract"))]
fn build_tract(_settings: &DetectorSettings, _labels: LabelMap) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow!("the tract backend requires the backend-tract feature"))
}
