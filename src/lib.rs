//! Bottle counter
//!
//! Counts bottles in a live camera feed or a folder of images using a
//! pre-trained detection model, shows annotated frames with a running count,
//! and logs user-triggered captures.
//!
//! # Module Structure
//!
//! - `ingest`: frame sources (network camera, image folder)
//! - `detect`: detector backends, label table, confidence filter
//! - `annotate`: boxes, labels and the running total drawn onto frames
//! - `capture`: capture images plus the append-only CSV log
//! - `session`: the Stopped/Running controller and its cycle loop
//! - `batch`: folder mode
//! - `display`, `control`, `ui`: toolkit-independent presentation and input
//! - `config`: file + environment configuration

pub mod annotate;
pub mod batch;
pub mod capture;
pub mod config;
pub mod control;
pub mod detect;
pub mod display;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod session;
pub mod ui;

pub use annotate::{overlay_text, Annotation, Annotator};
pub use batch::{run_batch, BatchSummary};
pub use capture::{CaptureLogger, CaptureRecord, LOG_HEADER};
pub use config::AppConfig;
pub use control::Command;
pub use detect::{
    counted, BoundingBox, Detection, DetectorBackend, LabelMap, StubBackend, StubResponse,
    CONFIDENCE_THRESHOLD,
};
pub use display::{FrameDisplay, Notice, PreviewDisplay};
pub use error::{CaptureError, DetectionError, SessionError, SourceError};
pub use frame::Frame;
pub use ingest::{CameraConfig, CameraSource, FolderSource, FrameSource};
pub use session::{CycleOutcome, Session, SessionState};
