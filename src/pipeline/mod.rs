//! Per-frame counting pipeline.
//!
//! The producer loop captures a frame, runs the detector, reduces the
//! detections to per-vehicle decisions and publishes a status line:
//!
//! capture -> detect -> partition -> classify -> dedup + count -> status
//!
//! All shared state lives in the [`Aggregator`]; the loop itself owns the
//! source, detector and sink.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::aggregate::{Aggregator, Decision, Totals};
use crate::classify::{FrameClassifier, Verdict};
use crate::detect::{BackendRegistry, Detection};
use crate::ingest::{FrameSource, SourceStats};

mod overlay;

pub use overlay::Overlay;

/// Status line shown while streaming.
pub fn status_line(totals: &Totals, network_fps: f32) -> String {
    format!(
        "ODOL: {} | Normal: {} | {:.0} FPS",
        totals.odol, totals.normal, network_fps
    )
}

/// Per-vehicle reduction of one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    pub vehicles: usize,
    pub cargo: usize,
    pub counted_odol: usize,
    pub counted_normal: usize,
    pub duplicates: usize,
}

pub struct FrameProcessor {
    classifier: FrameClassifier,
    duplicate_iou: f32,
    aggregator: Arc<Aggregator>,
}

impl FrameProcessor {
    pub fn new(
        classifier: FrameClassifier,
        duplicate_iou: f32,
        aggregator: Arc<Aggregator>,
    ) -> Self {
        Self {
            classifier,
            duplicate_iou,
            aggregator,
        }
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    /// Classifies every vehicle in the frame and counts the ones not seen before.
    ///
    /// Each vehicle is one aggregator transaction; vehicles within a frame are
    /// handled in detection order.
    pub fn process(&self, detections: Vec<Detection>) -> Result<FrameOutcome> {
        let partition = self.classifier.partition(detections);
        let mut outcome = FrameOutcome {
            vehicles: partition.vehicles.len(),
            cargo: partition.cargo.len(),
            ..FrameOutcome::default()
        };
        for vehicle in &partition.vehicles {
            let verdict = self.classifier.classify(vehicle, &partition.cargo);
            match self
                .aggregator
                .observe(vehicle.bbox, verdict, self.duplicate_iou)?
            {
                Decision::Counted(Verdict::Odol) => {
                    outcome.counted_odol += 1;
                    log::info!("counted ODOL vehicle '{}' at {:?}", vehicle.label, vehicle.bbox);
                }
                Decision::Counted(Verdict::Normal) => {
                    outcome.counted_normal += 1;
                    log::info!("counted normal vehicle '{}' at {:?}", vehicle.label, vehicle.bbox);
                }
                Decision::Duplicate => outcome.duplicates += 1,
            }
        }
        Ok(outcome)
    }
}

/// Receives the live status and overlay once per processed frame.
pub trait StatusSink: Send {
    fn render(&mut self, frame_index: u64, overlay: &[String]);

    fn set_status(&mut self, status: &str);
}

/// Status sink writing to the log.
#[derive(Debug, Default)]
pub struct LogStatusSink {
    last_status: String,
}

impl LogStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_status(&self) -> &str {
        &self.last_status
    }
}

impl StatusSink for LogStatusSink {
    fn render(&mut self, frame_index: u64, overlay: &[String]) {
        for line in overlay {
            log::trace!("frame {}: {}", frame_index, line);
        }
    }

    fn set_status(&mut self, status: &str) {
        if status != self.last_status {
            log::debug!("{}", status);
            self.last_status = status.to_string();
        }
    }
}

/// Shared streaming-active flag.
#[derive(Clone, Debug)]
pub struct StreamControl {
    streaming: Arc<AtomicBool>,
}

impl StreamControl {
    pub fn new() -> Self {
        Self {
            streaming: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.streaming.store(false, Ordering::SeqCst);
    }
}

impl Default for StreamControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters for one producer run.
#[derive(Clone, Debug, Default)]
pub struct ProducerStats {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub vehicles_seen: u64,
    pub duplicates: u64,
    pub source: SourceStats,
}

pub struct Producer {
    source: Box<dyn FrameSource>,
    detectors: BackendRegistry,
    processor: FrameProcessor,
    sink: Box<dyn StatusSink>,
    overlay: Overlay,
    frame_interval: Option<Duration>,
}

impl Producer {
    pub fn new(
        source: Box<dyn FrameSource>,
        detectors: BackendRegistry,
        processor: FrameProcessor,
        sink: Box<dyn StatusSink>,
    ) -> Self {
        Self {
            source,
            detectors,
            processor,
            sink,
            overlay: Overlay::NONE,
            frame_interval: None,
        }
    }

    pub fn with_overlay(mut self, overlay: Overlay) -> Self {
        self.overlay = overlay;
        self
    }

    /// Sleep between captures. `None` runs as fast as frames arrive.
    pub fn with_frame_interval(mut self, interval: Option<Duration>) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Runs until the stream stops, the source is exhausted or a recorded
    /// detector has replayed its last frame.
    pub fn run(mut self, control: &StreamControl) -> Result<ProducerStats> {
        self.source.connect()?;
        self.detectors.warm_up()?;
        let mut stats = ProducerStats::default();

        while control.is_streaming() {
            if self.source.is_exhausted() {
                log::info!("frame source exhausted");
                break;
            }
            if self.detectors.is_exhausted()? {
                log::info!("detector recording exhausted");
                break;
            }
            let Some(frame) = self.source.capture()? else {
                stats.frames_skipped += 1;
                log::trace!("no frame available, skipping cycle");
                self.pace();
                continue;
            };

            let detections = self.detectors.detect(&frame.view())?;
            let overlay = self.overlay.render(&detections);
            let outcome = self.processor.process(detections)?;

            stats.frames_processed += 1;
            stats.vehicles_seen += outcome.vehicles as u64;
            stats.duplicates += outcome.duplicates as u64;

            let totals = self.processor.aggregator().totals()?;
            let fps = self.detectors.network_fps()?;
            self.sink.render(frame.index, &overlay);
            self.sink.set_status(&status_line(&totals, fps));
            log::trace!("frame {} done in {}ms", frame.index, frame.age_ms());
            self.pace();
        }

        stats.source = self.source.stats();
        Ok(stats)
    }

    fn pace(&self) {
        if let Some(interval) = self.frame_interval {
            thread::sleep(interval);
        }
    }
}

/// Runs the producer on its own thread and signals `done` when it returns.
pub fn spawn_producer(
    producer: Producer,
    control: StreamControl,
    done: Sender<()>,
) -> Result<JoinHandle<Result<ProducerStats>>> {
    thread::Builder::new()
        .name("odol-producer".to_string())
        .spawn(move || {
            let result = producer.run(&control);
            if let Err(e) = &result {
                log::error!("producer stopped: {:#}", e);
            }
            let _ = done.send(());
            result
        })
        .map_err(|e| anyhow!("failed to spawn producer thread: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::DEFAULT_ASSOCIATION_IOU;
    use crate::geometry::BoundingBox;
    use crate::tracker::DEFAULT_DUPLICATE_IOU;

    fn processor() -> FrameProcessor {
        let labels = ["box_truck".to_string()].into_iter().collect();
        FrameProcessor::new(
            FrameClassifier::new(labels, "overdimension_load", DEFAULT_ASSOCIATION_IOU),
            DEFAULT_DUPLICATE_IOU,
            Arc::new(Aggregator::new()),
        )
    }

    fn det(label: &str, l: f32, t: f32, r: f32, b: f32) -> Detection {
        Detection::new(label, BoundingBox::new(l, t, r, b), 0.9)
    }

    #[test]
    fn status_line_format() {
        let totals = Totals { odol: 3, normal: 12 };
        assert_eq!(status_line(&totals, 29.6), "ODOL: 3 | Normal: 12 | 30 FPS");
    }

    #[test]
    fn process_reports_per_frame_outcome() -> Result<()> {
        let p = processor();
        let outcome = p.process(vec![
            det("box_truck", 0.0, 0.0, 10.0, 10.0),
            det("overdimension_load", 2.0, 2.0, 8.0, 8.0),
            det("box_truck", 100.0, 0.0, 110.0, 10.0),
            det("pedestrian", 50.0, 50.0, 52.0, 55.0),
        ])?;
        assert_eq!(
            outcome,
            FrameOutcome {
                vehicles: 2,
                cargo: 1,
                counted_odol: 1,
                counted_normal: 1,
                duplicates: 0,
            }
        );

        let again = p.process(vec![det("box_truck", 1.0, 0.0, 11.0, 10.0)])?;
        assert_eq!(again.duplicates, 1);
        assert_eq!(p.aggregator().totals()?, Totals { odol: 1, normal: 1 });
        Ok(())
    }

    #[test]
    fn overlapping_vehicles_in_one_frame_count_once() -> Result<()> {
        let p = processor();
        // iou = 80 / 120
        let outcome = p.process(vec![
            det("box_truck", 0.0, 0.0, 10.0, 10.0),
            det("box_truck", 2.0, 0.0, 12.0, 10.0),
        ])?;
        assert_eq!(outcome.vehicles, 2);
        assert_eq!(outcome.counted_normal, 1);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(p.aggregator().tracked_boxes()?, 1);
        Ok(())
    }

    #[test]
    fn stream_control_stops() {
        let control = StreamControl::new();
        let observer = control.clone();
        assert!(observer.is_streaming());
        control.stop();
        assert!(!observer.is_streaming());
    }

    #[test]
    fn log_sink_keeps_last_status() {
        let mut sink = LogStatusSink::new();
        sink.set_status("ODOL: 0 | Normal: 1 | 0 FPS");
        assert_eq!(sink.last_status(), "ODOL: 0 | Normal: 1 | 0 FPS");
    }
}
