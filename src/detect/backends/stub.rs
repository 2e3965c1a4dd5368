use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::error::DetectionError;
use crate::frame::Frame;

/// One canned answer from the stub backend.
#[derive(Clone, Debug)]
pub enum StubResponse {
    Detections(Vec<Detection>),
    Fail(String),
}

/// Stub backend for tests and model-less runs.
///
/// Replays a script of canned responses, one per call, wrapping around at the
/// end. An empty script reports nothing.
#[derive(Clone, Debug, Default)]
pub struct StubBackend {
    script: Vec<StubResponse>,
    calls: usize,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call with the same detections.
    pub fn repeating(detections: Vec<Detection>) -> Self {
        Self::scripted(vec![StubResponse::Detections(detections)])
    }

    pub fn scripted(script: Vec<StubResponse>) -> Self {
        Self { script, calls: 0 }
    }

    /// Number of `detect` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        let index = self.calls;
        self.calls += 1;
        if self.script.is_empty() {
            return Ok(Vec::new());
        }
        match &self.script[index % self.script.len()] {
            StubResponse::Detections(detections) => Ok(detections.clone()),
            StubResponse::Fail(reason) => Err(DetectionError::new(self.name(), reason.clone())),
        }
    }
}
