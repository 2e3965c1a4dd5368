//! batch_detect - count bottles in every image of a folder
//!
//! Writes `detection_<name>` copies with boxes and totals drawn on them.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use bottle_counter::config::AppConfig;
use bottle_counter::detect::build_backend;
use bottle_counter::ui::Ui;
use bottle_counter::{run_batch, Annotator, FolderSource};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "BOTTLE_COUNTER_CONFIG")]
    config: Option<PathBuf>,
    /// Folder of .png/.jpg/.jpeg images (defaults to the configured input).
    #[arg(long)]
    input: Option<PathBuf>,
    /// Folder for annotated output (defaults to the configured output).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output style: plain or pretty.
    #[arg(long)]
    ui: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = AppConfig::load_from(args.config.as_deref())?;
    let ui = Ui::from_args(args.ui.as_deref());

    let input = args.input.unwrap_or_else(|| cfg.batch.input_dir.clone());
    let output = args.out.unwrap_or_else(|| cfg.batch.output_dir.clone());

    let mut detector = {
        let _stage = ui.stage("load detector");
        build_backend(&cfg.detector)?
    };
    let annotator = match &cfg.display.font_path {
        Some(path) => Annotator::from_font_file(path)?,
        None => Annotator::new(),
    };

    let mut source = FolderSource::open(&input)
        .with_context(|| format!("cannot scan {}", input.display()))?;

    let summary = {
        let stage = ui.stage(&format!("detect bottles in {} image(s)", source.total()));
        run_batch(&mut source, &mut detector, &annotator, &output, |line| {
            stage.println(line)
        })?
    };

    println!(
        "{} image(s) processed, {} skipped, {} bottle(s) counted; output in {}",
        summary.processed,
        summary.skipped,
        summary.total_bottles,
        output.display()
    );
    Ok(())
}
