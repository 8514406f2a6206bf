//! ODOL counter
//!
//! Counts overdimension/overload (ODOL) vehicles in a video stream from
//! per-frame object detections.
//!
//! # Architecture
//!
//! Each frame is reduced to per-vehicle decisions:
//!
//! 1. **Partition**: detections are split into vehicles and cargo by label;
//!    anything else is ignored.
//! 2. **Classify**: a vehicle is ODOL when a cargo region overlaps its box
//!    above the association IoU threshold.
//! 3. **Deduplicate**: a vehicle overlapping an already counted box above the
//!    duplicate IoU threshold is a re-detection and is not counted again.
//! 4. **Aggregate**: the duplicate check, registry append and counter
//!    increment run as one critical section.
//!
//! # Module Structure
//!
//! - `geometry`: `BoundingBox` and IoU
//! - `classify`: frame partition and the ODOL rule
//! - `tracker`: counted-box registry and duplicate check
//! - `aggregate`: thread-safe totals
//! - `detect`, `ingest`, `frame`, `labels`: detector and camera seams
//! - `pipeline`, `report`: producer loop, status line, periodic reports
//! - `config`: static configuration

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod detect;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod labels;
pub mod pipeline;
pub mod report;
pub mod tracker;

pub use aggregate::{Aggregator, Decision, Snapshot, Totals};
pub use classify::{FrameClassifier, Partition, Verdict, DEFAULT_ASSOCIATION_IOU};
pub use config::{CounterConfig, Thresholds};
pub use detect::{
    BackendRegistry, Detection, DetectorBackend, RawDetection, ReplayBackend, StubBackend,
    StubScene,
};
pub use frame::{Frame, FrameView};
pub use geometry::{iou, BoundingBox};
pub use ingest::{FrameSource, SyntheticConfig, SyntheticSource};
pub use labels::ClassLabels;
pub use pipeline::{
    spawn_producer, status_line, FrameOutcome, FrameProcessor, LogStatusSink, Overlay, Producer,
    ProducerStats, StatusSink, StreamControl,
};
pub use report::{final_summary, spawn_reporter, ReporterHandle};
pub use tracker::{is_new_vehicle, CountedBoxRegistry, DEFAULT_DUPLICATE_IOU};
