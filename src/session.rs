//! Session controller.
//!
//! Two states, `Stopped` and `Running`. While running, each cycle pulls one
//! frame, detects, annotates, displays and updates whether capture is
//! enabled; the next cycle is scheduled only after the previous one finished,
//! so detector calls never overlap. Capture runs inline between cycles.
//!
//! The frame source is owned here and released exactly once: on `stop()`, on
//! end of stream, or when the connection is lost. A session whose source is
//! released cannot be started again.

use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

use crate::annotate::Annotator;
use crate::capture::{CaptureLogger, CaptureRecord};
use crate::control::Command;
use crate::detect::{counted, Detection, DetectorBackend};
use crate::display::{FrameDisplay, Notice};
use crate::error::SessionError;
use crate::frame::Frame;
use crate::ingest::FrameSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Running,
}

/// What a single cycle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Not running; nothing happened.
    Idle,
    /// Frame annotated and displayed with this many counted bottles.
    Displayed { count: usize },
    /// The frame could not be decoded; the cycle was skipped.
    FrameSkipped,
    /// The detector failed; the raw frame was shown without annotation.
    DetectionFailed,
    /// The source ran out of frames; the session stopped.
    EndOfStream,
    /// The source connection failed; the session stopped.
    SourceLost,
}

/// The latest successfully annotated cycle.
struct LatestCycle {
    annotated: Frame,
    detections: Vec<Detection>,
    count: usize,
}

pub struct Session<S, D, V> {
    state: SessionState,
    source: Option<S>,
    detector: D,
    annotator: Annotator,
    logger: CaptureLogger,
    display: V,
    latest: Option<LatestCycle>,
    cycles: u64,
}

impl<S, D, V> Session<S, D, V>
where
    S: FrameSource,
    D: DetectorBackend,
    V: FrameDisplay,
{
    pub fn new(source: S, detector: D, annotator: Annotator, logger: CaptureLogger, display: V) -> Self {
        Self {
            state: SessionState::Stopped,
            source: Some(source),
            detector,
            annotator,
            logger,
            display,
            latest: None,
            cycles: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// False once the source has been released.
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Number of cycles that reached the source.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Counted bottles in the latest annotated cycle.
    pub fn latest_count(&self) -> usize {
        self.latest.as_ref().map_or(0, |latest| latest.count)
    }

    /// Capture is enabled only while running with at least one counted bottle.
    pub fn capture_enabled(&self) -> bool {
        self.is_running() && self.latest_count() > 0
    }

    pub fn display(&self) -> &V {
        &self.display
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.source.is_none() {
            return Err(SessionError::SourceReleased);
        }
        if self.is_running() {
            return Err(SessionError::AlreadyRunning);
        }
        self.state = SessionState::Running;
        self.latest = None;
        if let Some(source) = &self.source {
            log::info!("session started on {}", source.describe());
        }
        Ok(())
    }

    /// Stop and release the source. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.state = SessionState::Stopped;
        self.latest = None;
        if let Some(source) = self.source.take() {
            log::info!(
                "session stopped after {} cycle(s); releasing {}",
                self.cycles,
                source.describe()
            );
            drop(source);
        }
    }

    /// Run one pull-detect-annotate-display cycle.
    pub fn cycle(&mut self) -> CycleOutcome {
        if !self.is_running() {
            return CycleOutcome::Idle;
        }
        let Some(source) = self.source.as_mut() else {
            self.state = SessionState::Stopped;
            return CycleOutcome::Idle;
        };
        self.cycles += 1;

        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::info!("source exhausted");
                self.stop();
                return CycleOutcome::EndOfStream;
            }
            Err(e) if e.is_fatal() => {
                log::error!("{}", e);
                self.display
                    .notify(Notice::error("Camera unavailable", e.to_string()));
                self.stop();
                return CycleOutcome::SourceLost;
            }
            Err(e) => {
                log::warn!("skipping frame: {}", e);
                return CycleOutcome::FrameSkipped;
            }
        };

        let started = Instant::now();
        let detections = match self.detector.detect(&frame) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("{}", e);
                self.latest = None;
                if let Err(e) = self.display.show(&frame, 0, false) {
                    log::warn!("display failed: {:#}", e);
                }
                return CycleOutcome::DetectionFailed;
            }
        };
        log::debug!(
            "cycle {}: {} detection(s) in {}ms",
            self.cycles,
            detections.len(),
            started.elapsed().as_millis()
        );

        let annotation = self.annotator.annotate(&frame, &detections);
        let count = annotation.count;
        if let Err(e) = self.display.show(&annotation.frame, count, count > 0) {
            log::warn!("display failed: {:#}", e);
        }
        self.latest = Some(LatestCycle {
            annotated: annotation.frame,
            detections,
            count,
        });
        CycleOutcome::Displayed { count }
    }

    /// Persist the latest annotated frame. A no-op while capture is disabled.
    pub fn capture(&mut self) -> Result<Option<CaptureRecord>, SessionError> {
        if !self.capture_enabled() {
            log::debug!("capture ignored: no bottles in the current frame");
            return Ok(None);
        }
        let Some(latest) = &self.latest else {
            return Ok(None);
        };
        debug_assert_eq!(counted(&latest.detections).len(), latest.count);

        match self.logger.log_capture(&latest.annotated, &latest.detections) {
            Ok(record) => {
                self.display.notify(Notice::info(
                    "Image Captured",
                    format!(
                        "Image saved as {}\nTotal Bottles: {}\nBottles: {}",
                        record.image_path.display(),
                        record.total_count,
                        record.label_list()
                    ),
                ));
                Ok(Some(record))
            }
            Err(e) => {
                self.display.notify(Notice::error("Capture failed", e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Apply one command. Returns false when the session should end.
    pub fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Start => {
                if let Err(e) = self.start() {
                    log::warn!("start ignored: {}", e);
                }
                true
            }
            Command::End => {
                self.stop();
                false
            }
            Command::Capture => {
                // Failures were already surfaced through the display.
                let _ = self.capture();
                true
            }
        }
    }

    /// Drive the session from a command channel until End, end of stream, or
    /// a lost source. Cycles are spaced by `cycle_delay`.
    pub fn run(&mut self, commands: &Receiver<Command>, cycle_delay: Duration) {
        loop {
            loop {
                match commands.try_recv() {
                    Ok(command) => {
                        if !self.handle(command) {
                            return;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.stop();
                        return;
                    }
                }
            }

            if !self.has_source() {
                return;
            }
            self.cycle();
            if !self.has_source() {
                return;
            }

            match commands.recv_timeout(cycle_delay) {
                Ok(command) => {
                    if !self.handle(command) {
                        return;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.stop();
                    return;
                }
            }
        }
    }
}
