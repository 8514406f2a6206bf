//! Replays detections recorded from a real model run.
//!
//! File layout (JSON), one entry per frame in stream order:
//!
//! ```json
//! [
//!   {"detections": [{"class_id": 1, "bbox": [0, 0, 10, 10], "confidence": 0.9}]},
//!   {"detections": []}
//! ]
//! ```

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

use crate::detect::backend::DetectorBackend;
use crate::detect::fps::FpsMeter;
use crate::detect::result::RawDetection;
use crate::frame::FrameView;

#[derive(Debug, Deserialize)]
struct RecordedFrame {
    #[serde(default)]
    detections: Vec<RawDetection>,
}

pub struct ReplayBackend {
    frames: Vec<Vec<RawDetection>>,
    /// One past the highest frame index served so far.
    served: usize,
    fps: FpsMeter,
}

impl ReplayBackend {
    pub fn from_frames(frames: Vec<Vec<RawDetection>>) -> Self {
        Self {
            frames,
            served: 0,
            fps: FpsMeter::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read replay file {}: {}", path.display(), e))?;
        let backend = Self::parse(&raw)
            .map_err(|e| anyhow!("invalid replay file {}: {}", path.display(), e))?;
        log::info!(
            "ReplayBackend: loaded {} recorded frames from {}",
            backend.len(),
            path.display()
        );
        Ok(backend)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let recorded: Vec<RecordedFrame> = serde_json::from_str(raw)?;
        Ok(Self::from_frames(
            recorded.into_iter().map(|f| f.detections).collect(),
        ))
    }

    /// Number of recorded frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl DetectorBackend for ReplayBackend {
    fn name(&self) -> &'static str {
        "replay"
    }

    /// Detections recorded for the frame's index; empty past the recording.
    fn detect(&mut self, frame: &FrameView<'_>) -> Result<Vec<RawDetection>> {
        self.fps.tick();
        let Ok(idx) = usize::try_from(frame.index()) else {
            self.served = usize::MAX;
            return Ok(Vec::new());
        };
        self.served = self.served.max(idx.saturating_add(1));
        Ok(self.frames.get(idx).cloned().unwrap_or_default())
    }

    /// Every recorded frame has been served.
    fn is_exhausted(&self) -> bool {
        self.served >= self.frames.len()
    }

    fn network_fps(&self) -> f32 {
        self.fps.fps()
    }
}
