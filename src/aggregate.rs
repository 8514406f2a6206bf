//! Thread-safe running totals.
//!
//! The counted-box registry and the counters live behind one `Mutex`. A
//! vehicle decision (duplicate check, registry append, counter increment) runs
//! under a single guard, so two concurrent detections of the same vehicle
//! cannot both be admitted and a snapshot never observes half a decision.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

use crate::classify::Verdict;
use crate::geometry::BoundingBox;
use crate::tracker::CountedBoxRegistry;

/// Process-wide vehicle totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub odol: u64,
    pub normal: u64,
}

impl Totals {
    pub fn total(&self) -> u64 {
        self.odol + self.normal
    }

    fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Odol => self.odol += 1,
            Verdict::Normal => self.normal += 1,
        }
    }
}

/// What happened to one vehicle handed to [`Aggregator::observe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Counted(Verdict),
    Duplicate,
}

/// Key/value view used by the periodic report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub odol: u64,
    pub normal: u64,
    pub total: u64,
    pub tracked_boxes: usize,
}

#[derive(Debug, Default)]
struct State {
    registry: CountedBoxRegistry,
    totals: Totals,
}

#[derive(Debug, Default)]
pub struct Aggregator {
    state: Mutex<State>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("aggregator lock poisoned"))
    }

    /// Counts one vehicle without deduplication.
    pub fn record_vehicle(&self, is_odol: bool) -> Result<()> {
        self.lock()?.totals.record(Verdict::from_odol(is_odol));
        Ok(())
    }

    /// Counts `bbox` unless it re-detects an already counted vehicle.
    pub fn observe(
        &self,
        bbox: BoundingBox,
        verdict: Verdict,
        duplicate_iou: f32,
    ) -> Result<Decision> {
        let mut state = self.lock()?;
        if !state.registry.admit(bbox, duplicate_iou) {
            return Ok(Decision::Duplicate);
        }
        state.totals.record(verdict);
        Ok(Decision::Counted(verdict))
    }

    /// Consistent `(odol, normal)` pair.
    pub fn totals(&self) -> Result<Totals> {
        Ok(self.lock()?.totals)
    }

    pub fn tracked_boxes(&self) -> Result<usize> {
        Ok(self.lock()?.registry.len())
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        let state = self.lock()?;
        Ok(Snapshot {
            odol: state.totals.odol,
            normal: state.totals.normal,
            total: state.totals.total(),
            tracked_boxes: state.registry.len(),
        })
    }
}
