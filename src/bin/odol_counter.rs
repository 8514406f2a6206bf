//! odol_counter - ODOL vehicle counting daemon
//!
//! This binary:
//! 1. Captures frames from the configured source
//! 2. Runs the detector backend (stub scene or recorded replay)
//! 3. Classifies and deduplicates vehicles, updating the shared totals
//! 4. Logs a totals report every interval
//! 5. Prints the final totals on Ctrl-C or when the source runs out

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use odol_counter::{
    final_summary, ingest, spawn_producer, spawn_reporter, Aggregator, BackendRegistry,
    ClassLabels, CounterConfig, FrameProcessor, LogStatusSink, Overlay, Producer, ReplayBackend,
    StreamControl, StubBackend, StubScene,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "ODOL_CONFIG")]
    config: Option<PathBuf>,
    /// Overlay options, e.g. 'box,labels' or 'none'.
    #[arg(long, default_value = "box,labels")]
    overlay: Overlay,
    /// Frame source url (overrides config).
    #[arg(long)]
    source: Option<String>,
    /// Replay detections recorded in this JSON file instead of the stub scene.
    #[arg(long)]
    replay: Option<PathBuf>,
    /// Stop after this many frames (0 runs until Ctrl-C).
    #[arg(long, default_value_t = 0)]
    frames: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = CounterConfig::load_from(args.config.as_deref())?;

    let labels = match &cfg.labels.path {
        Some(path) => ClassLabels::load(path)?,
        None => builtin_labels(&cfg),
    };

    let mut detectors = BackendRegistry::new(labels.clone(), cfg.min_confidence);
    match &args.replay {
        Some(path) => detectors.register(ReplayBackend::load(path)?),
        None => {
            let vehicle = cfg
                .labels
                .vehicles
                .iter()
                .next()
                .ok_or_else(|| anyhow!("no vehicle label configured"))?;
            let scene = StubScene::for_labels(&labels, vehicle, &cfg.labels.cargo)?;
            detectors.register(StubBackend::new(scene));
        }
    }

    let url = args.source.clone().unwrap_or_else(|| cfg.source.url.clone());
    let max_frames = (args.frames > 0).then_some(args.frames);
    let source = ingest::open_source(&url, cfg.source.width, cfg.source.height, max_frames)?;

    let aggregator = Arc::new(Aggregator::new());
    let processor = FrameProcessor::new(
        cfg.classifier(),
        cfg.thresholds.duplicate_iou,
        Arc::clone(&aggregator),
    );
    let producer = Producer::new(source, detectors, processor, Box::new(LogStatusSink::new()))
        .with_overlay(args.overlay)
        .with_frame_interval(Some(cfg.frame_interval()));

    log::info!("odol_counter running. source={}", url);
    log::info!(
        "vehicle_labels={:?} cargo_label={} association_iou={} duplicate_iou={}",
        cfg.labels.vehicles,
        cfg.labels.cargo,
        cfg.thresholds.association_iou,
        cfg.thresholds.duplicate_iou
    );

    let (tx, rx) = mpsc::channel();
    let ctrlc_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    let control = StreamControl::new();
    let producer_handle = spawn_producer(producer, control.clone(), tx)?;
    let reporter = spawn_reporter(Arc::clone(&aggregator), cfg.report_interval)?;

    log::info!("waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("stopping stream...");
    control.stop();

    let producer_result = producer_handle
        .join()
        .map_err(|_| anyhow!("producer thread panicked"))?;
    let reports = reporter.stop()?;

    let totals = aggregator.totals()?;
    println!("{}", final_summary(&totals));

    let stats = producer_result?;
    log::info!(
        "frames processed={} skipped={} vehicles seen={} duplicates={} reports={}",
        stats.frames_processed,
        stats.frames_skipped,
        stats.vehicles_seen,
        stats.duplicates,
        reports
    );
    log::info!(
        "source {}: captured={} skipped={}",
        stats.source.url,
        stats.source.frames_captured,
        stats.source.frames_skipped
    );
    Ok(())
}

/// Label table used when no labels file is configured: background, the
/// vehicle classes in order, then the cargo class.
fn builtin_labels(cfg: &CounterConfig) -> ClassLabels {
    ClassLabels::new(
        std::iter::once("BACKGROUND".to_string())
            .chain(cfg.labels.vehicles.iter().cloned())
            .chain(std::iter::once(cfg.labels.cargo.clone())),
    )
}
