//! bottle_counter - live bottle counting from a network camera
//!
//! Reads frames from the configured camera, counts bottles with the
//! configured detector and shows the annotated result. Type `start`,
//! `capture` or `end` on stdin; Ctrl-C ends the session.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use bottle_counter::config::AppConfig;
use bottle_counter::control::{self, Command};
use bottle_counter::detect::build_backend;
use bottle_counter::ui::Ui;
use bottle_counter::{Annotator, CameraConfig, CameraSource, CaptureLogger, PreviewDisplay, Session};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "BOTTLE_COUNTER_CONFIG")]
    config: Option<PathBuf>,
    /// Output style: plain or pretty.
    #[arg(long)]
    ui: Option<String>,
    /// Start detecting immediately instead of waiting for `start`.
    #[arg(long)]
    autostart: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = AppConfig::load_from(args.config.as_deref())?;
    let ui = Ui::from_args(args.ui.as_deref());

    let detector = {
        let _stage = ui.stage("load detector");
        let mut detector = build_backend(&cfg.detector)?;
        detector.warm_up().context("detector warm-up failed")?;
        detector
    };

    let annotator = match &cfg.display.font_path {
        Some(path) => Annotator::from_font_file(path)?,
        None => Annotator::new(),
    };

    let source = CameraSource::new(CameraConfig {
        url: cfg.camera.url.clone(),
        target_fps: cfg.camera.target_fps,
        ..CameraConfig::default()
    })?;
    let logger = CaptureLogger::new(&cfg.capture.image_dir, &cfg.capture.log_path);
    let display = PreviewDisplay::new(&ui, cfg.display.preview_path.clone());

    let (tx, rx) = control::channel();
    control::install_interrupt_handler(tx.clone())?;
    control::spawn_stdin_reader(tx.clone())?;
    if args.autostart {
        let _ = tx.send(Command::Start);
    }
    drop(tx);

    log::info!("camera: {}", cfg.camera.url);
    log::info!(
        "captures: {} (log {})",
        cfg.capture.image_dir.display(),
        cfg.capture.log_path.display()
    );
    if let Some(path) = &cfg.display.preview_path {
        log::info!("preview: {}", path.display());
    }
    eprintln!("commands: start | capture | end");

    let mut session = Session::new(source, detector, annotator, logger, display);
    session.run(&rx, cfg.cycle_delay);

    log::info!("bottle counter closed after {} cycle(s)", session.cycles());
    Ok(())
}
