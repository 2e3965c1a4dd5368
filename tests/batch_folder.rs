use std::path::Path;

use image::{Rgb, RgbImage};

use bottle_counter::batch::COMPLETION_MESSAGE;
use bottle_counter::{
    run_batch, Annotator, BoundingBox, Detection, FolderSource, StubBackend, StubResponse,
};

fn write_image(dir: &Path, name: &str) {
    RgbImage::from_pixel(48, 32, Rgb([200, 200, 200]))
        .save(dir.join(name))
        .expect("write image");
}

fn bottle(label: &str, confidence: f32) -> Detection {
    Detection::new(label, 0, confidence, BoundingBox::new(2.0, 2.0, 20.0, 28.0))
}

#[test]
fn empty_folder_only_reports_completion() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let mut source = FolderSource::open(input.path()).unwrap();
    let mut detector = StubBackend::new();
    let mut lines = Vec::new();

    let summary = run_batch(
        &mut source,
        &mut detector,
        &Annotator::new(),
        output.path(),
        |line| lines.push(line.to_string()),
    )
    .unwrap();

    assert_eq!(summary.processed, 0);
    assert!(summary.outputs.is_empty());
    assert_eq!(lines, vec![COMPLETION_MESSAGE.to_string()]);
    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
}

#[test]
fn writes_prefixed_outputs_with_counts() {
    let input = tempfile::tempdir().unwrap();
    let output_root = tempfile::tempdir().unwrap();
    let output = output_root.path().join("RESD");
    write_image(input.path(), "a.png");
    write_image(input.path(), "b.jpg");
    std::fs::write(input.path().join("notes.txt"), "not an image").unwrap();

    let mut source = FolderSource::open(input.path()).unwrap();
    assert_eq!(source.total(), 2);
    let mut detector = StubBackend::scripted(vec![
        StubResponse::Detections(vec![bottle("blueBottle", 0.9), bottle("greenBottle", 0.3)]),
        StubResponse::Detections(vec![bottle("redBottle", 0.7), bottle("clearBottle", 0.51)]),
    ]);
    let mut lines = Vec::new();

    let summary = run_batch(
        &mut source,
        &mut detector,
        &Annotator::new(),
        &output,
        |line| lines.push(line.to_string()),
    )
    .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.total_bottles, 3);
    assert!(output.join("detection_a.png").exists());
    assert!(output.join("detection_b.jpg").exists());
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("detection_a.png - Bottles counted: 1"));
    assert!(lines[1].ends_with("detection_b.jpg - Bottles counted: 2"));
    assert_eq!(lines[2], COMPLETION_MESSAGE);
}

#[test]
fn unreadable_images_and_failed_detections_are_skipped() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    std::fs::write(input.path().join("broken.jpg"), b"not really a jpeg").unwrap();
    write_image(input.path(), "c.png");
    write_image(input.path(), "d.png");

    let mut source = FolderSource::open(input.path()).unwrap();
    let mut detector = StubBackend::scripted(vec![
        StubResponse::Fail("model error".into()),
        StubResponse::Detections(vec![bottle("blueBottle", 0.8)]),
    ]);

    let summary = run_batch(
        &mut source,
        &mut detector,
        &Annotator::new(),
        output.path(),
        |_| {},
    )
    .unwrap();

    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.total_bottles, 1);
    assert!(output.path().join("detection_d.png").exists());
    assert!(!output.path().join("detection_c.png").exists());
}
