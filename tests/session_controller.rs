use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use tempfile::TempDir;

use bottle_counter::control::{self, Command};
use bottle_counter::display::{FrameDisplay, Notice};
use bottle_counter::{
    Annotator, BoundingBox, CaptureLogger, CycleOutcome, Detection, Frame, FrameSource,
    Session, SessionError, SessionState, SourceError, StubBackend, StubResponse,
};

type Pull = Result<Option<Frame>, SourceError>;

struct QueueSource {
    pulls: VecDeque<Pull>,
    released: Arc<AtomicUsize>,
}

impl QueueSource {
    fn frames(n: usize, released: &Arc<AtomicUsize>) -> Self {
        Self::scripted((0..n).map(|_| Ok(Some(frame()))).collect(), released)
    }

    fn scripted(pulls: Vec<Pull>, released: &Arc<AtomicUsize>) -> Self {
        Self {
            pulls: pulls.into(),
            released: released.clone(),
        }
    }
}

impl FrameSource for QueueSource {
    fn next_frame(&mut self) -> Pull {
        self.pulls.pop_front().unwrap_or(Ok(None))
    }

    fn describe(&self) -> String {
        "queue".to_string()
    }
}

impl Drop for QueueSource {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingDisplay {
    shown: Vec<(usize, bool)>,
    notices: Vec<Notice>,
}

impl FrameDisplay for RecordingDisplay {
    fn show(&mut self, _frame: &Frame, count: usize, capture_enabled: bool) -> anyhow::Result<()> {
        self.shown.push((count, capture_enabled));
        Ok(())
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

fn frame() -> Frame {
    Frame::new(RgbImage::new(64, 48))
}

fn scenario_detections() -> Vec<Detection> {
    vec![
        Detection::new("blueBottle", 3, 0.9, BoundingBox::new(4.0, 4.0, 20.0, 40.0)),
        Detection::new("greenBottle", 4, 0.3, BoundingBox::new(30.0, 4.0, 50.0, 40.0)),
    ]
}

fn session(
    source: QueueSource,
    detector: StubBackend,
    dir: &TempDir,
) -> Session<QueueSource, StubBackend, RecordingDisplay> {
    Session::new(
        source,
        detector,
        Annotator::new(),
        CaptureLogger::new(dir.path().join("captured_images"), dir.path().join("log.csv")),
        RecordingDisplay::default(),
    )
}

#[test]
fn capture_is_disabled_without_detections() {
    let dir = tempfile::tempdir().unwrap();
    let released = Arc::new(AtomicUsize::new(0));
    let mut session = session(QueueSource::frames(2, &released), StubBackend::new(), &dir);

    session.start().unwrap();
    assert_eq!(session.cycle(), CycleOutcome::Displayed { count: 0 });
    assert!(!session.capture_enabled());
    assert!(session.capture().unwrap().is_none());
    assert!(!dir.path().join("log.csv").exists());
    assert_eq!(session.display().shown, vec![(0, false)]);
}

#[test]
fn capture_logs_only_confident_bottles() {
    let dir = tempfile::tempdir().unwrap();
    let released = Arc::new(AtomicUsize::new(0));
    let mut session = session(
        QueueSource::frames(3, &released),
        StubBackend::repeating(scenario_detections()),
        &dir,
    );

    assert!(session.capture().unwrap().is_none(), "disabled before start");
    session.start().unwrap();
    assert_eq!(session.cycle(), CycleOutcome::Displayed { count: 1 });
    assert!(session.capture_enabled());

    let record = session.capture().unwrap().expect("capture record");
    assert_eq!(record.total_count, 1);
    assert_eq!(record.label_list(), "blueBottle");
    assert!(record.image_path.exists());

    let log = std::fs::read_to_string(dir.path().join("log.csv")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "Image Filename,Timestamp,Total Count,Bottle Names");
    assert!(lines[1].ends_with(",1,blueBottle"));

    match session.display().notices.last() {
        Some(Notice::Info { title, body }) => {
            assert_eq!(title, "Image Captured");
            assert!(body.contains("Total Bottles: 1"));
        }
        other => panic!("unexpected notice {:?}", other),
    }
}

#[test]
fn end_of_stream_stops_and_releases_once() {
    let dir = tempfile::tempdir().unwrap();
    let released = Arc::new(AtomicUsize::new(0));
    let mut session = session(QueueSource::frames(1, &released), StubBackend::new(), &dir);

    session.start().unwrap();
    assert_eq!(session.cycle(), CycleOutcome::Displayed { count: 0 });
    assert_eq!(session.cycle(), CycleOutcome::EndOfStream);
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(released.load(Ordering::SeqCst), 1);

    session.stop();
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert!(matches!(session.start(), Err(SessionError::SourceReleased)));
    assert_eq!(session.cycle(), CycleOutcome::Idle);
    drop(session);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn start_is_only_valid_from_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let released = Arc::new(AtomicUsize::new(0));
    let mut session = session(QueueSource::frames(1, &released), StubBackend::new(), &dir);

    assert_eq!(session.cycle(), CycleOutcome::Idle);
    session.start().unwrap();
    assert!(matches!(session.start(), Err(SessionError::AlreadyRunning)));
    assert!(session.is_running());
}

#[test]
fn detection_failure_skips_annotation_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let released = Arc::new(AtomicUsize::new(0));
    let detector = StubBackend::scripted(vec![
        StubResponse::Detections(scenario_detections()),
        StubResponse::Fail("inference timed out".into()),
        StubResponse::Detections(scenario_detections()),
    ]);
    let mut session = session(QueueSource::frames(3, &released), detector, &dir);

    session.start().unwrap();
    assert_eq!(session.cycle(), CycleOutcome::Displayed { count: 1 });
    assert!(session.capture_enabled());
    assert_eq!(session.cycle(), CycleOutcome::DetectionFailed);
    assert!(!session.capture_enabled());
    assert!(session.capture().unwrap().is_none());
    assert_eq!(session.cycle(), CycleOutcome::Displayed { count: 1 });
    assert!(session.is_running());
    assert_eq!(session.display().shown, vec![(1, true), (0, false), (1, true)]);
}

#[test]
fn undecodable_frame_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let released = Arc::new(AtomicUsize::new(0));
    let source = QueueSource::scripted(
        vec![
            Err(SourceError::Decode {
                origin: "camera".into(),
                reason: "truncated jpeg".into(),
            }),
            Ok(Some(frame())),
        ],
        &released,
    );
    let mut session = session(source, StubBackend::new(), &dir);

    session.start().unwrap();
    assert_eq!(session.cycle(), CycleOutcome::FrameSkipped);
    assert!(session.is_running());
    assert_eq!(session.cycle(), CycleOutcome::Displayed { count: 0 });
    assert_eq!(released.load(Ordering::SeqCst), 0);
}

#[test]
fn lost_connection_stops_with_notice() {
    let dir = tempfile::tempdir().unwrap();
    let released = Arc::new(AtomicUsize::new(0));
    let source = QueueSource::scripted(
        vec![Err(SourceError::Connection {
            source_name: "http://camera/video".into(),
            reason: "connection reset".into(),
        })],
        &released,
    );
    let mut session = session(source, StubBackend::new(), &dir);

    session.start().unwrap();
    assert_eq!(session.cycle(), CycleOutcome::SourceLost);
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert!(matches!(
        session.display().notices.last(),
        Some(Notice::Error { .. })
    ));
}

#[test]
fn failed_log_write_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("log.csv")).unwrap();
    let released = Arc::new(AtomicUsize::new(0));
    let mut session = session(
        QueueSource::frames(1, &released),
        StubBackend::repeating(scenario_detections()),
        &dir,
    );

    session.start().unwrap();
    session.cycle();
    let err = session.capture().unwrap_err();
    assert!(matches!(err, SessionError::Capture(_)));
    assert!(matches!(
        session.display().notices.last(),
        Some(Notice::Error { .. })
    ));
    assert!(session.is_running());
}

#[test]
fn run_loop_cycles_until_source_ends() {
    let dir = tempfile::tempdir().unwrap();
    let released = Arc::new(AtomicUsize::new(0));
    let mut session = session(
        QueueSource::frames(3, &released),
        StubBackend::repeating(scenario_detections()),
        &dir,
    );
    let (tx, rx) = control::channel();
    tx.send(Command::Start).unwrap();

    session.run(&rx, Duration::from_millis(1));

    assert_eq!(session.cycles(), 4);
    assert_eq!(session.display().shown.len(), 3);
    assert_eq!(released.load(Ordering::SeqCst), 1);
    drop(tx);
}

#[test]
fn end_command_stops_before_any_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let released = Arc::new(AtomicUsize::new(0));
    let mut session = session(QueueSource::frames(3, &released), StubBackend::new(), &dir);
    let (tx, rx) = control::channel();
    tx.send(Command::Start).unwrap();
    tx.send(Command::End).unwrap();

    session.run(&rx, Duration::from_millis(1));

    assert_eq!(session.cycles(), 0);
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}
