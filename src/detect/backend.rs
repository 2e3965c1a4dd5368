use crate::detect::result::Detection;
use crate::error::DetectionError;
use crate::frame::Frame;

/// Detector backend trait.
///
/// A backend wraps one external model. Calls block until the model returns
/// and never overlap; the session drives them one cycle at a time.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    ///
    /// Returns every detection the model reports, in model order. Threshold
    /// filtering is the caller's job (see `detect::counted`).
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<(), DetectionError> {
        Ok(())
    }
}

impl<B: DetectorBackend + ?Sized> DetectorBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        (**self).detect(frame)
    }

    fn warm_up(&mut self) -> Result<(), DetectionError> {
        (**self).warm_up()
    }
}
