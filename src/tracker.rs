//! Positional deduplication of counted vehicles.
//!
//! A vehicle is the same physical vehicle as an earlier one when its box
//! overlaps a counted box above the duplicate threshold. There are no track
//! ids, no motion model and no expiry: the registry only grows for the
//! lifetime of the run, so each check is linear in the number of vehicles
//! counted so far.

use crate::geometry::{iou, BoundingBox};

/// Default IoU above which a detection is a re-detection of a counted vehicle.
pub const DEFAULT_DUPLICATE_IOU: f32 = 0.5;

/// Append-only list of boxes already counted.
#[derive(Clone, Debug, Default)]
pub struct CountedBoxRegistry {
    boxes: Vec<BoundingBox>,
}

impl CountedBoxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bbox: BoundingBox) {
        self.boxes.push(bbox);
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundingBox> {
        self.boxes.iter()
    }

    /// Registers `bbox` if it is new and reports whether it was.
    pub fn admit(&mut self, bbox: BoundingBox, duplicate_iou: f32) -> bool {
        if !is_new_vehicle(&bbox, self, duplicate_iou) {
            return false;
        }
        self.push(bbox);
        true
    }
}

/// True iff `bbox` overlaps no registered box above `duplicate_iou`.
pub fn is_new_vehicle(
    bbox: &BoundingBox,
    registry: &CountedBoxRegistry,
    duplicate_iou: f32,
) -> bool {
    registry
        .iter()
        .all(|counted| iou(bbox, counted) <= duplicate_iou)
}
