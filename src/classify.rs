//! Per-frame reduction: split detections into vehicles and cargo, then decide
//! whether a vehicle carries an overload region.

use std::collections::BTreeSet;

use crate::detect::Detection;
use crate::geometry::iou;

/// Default IoU above which a cargo region is associated with a vehicle.
pub const DEFAULT_ASSOCIATION_IOU: f32 = 0.3;

/// Detections of one frame, split by label.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Partition {
    pub vehicles: Vec<Detection>,
    pub cargo: Vec<Detection>,
}

/// Outcome of classifying one vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    Odol,
    Normal,
}

impl Verdict {
    pub fn from_odol(is_odol: bool) -> Self {
        if is_odol {
            Verdict::Odol
        } else {
            Verdict::Normal
        }
    }

    pub fn is_odol(self) -> bool {
        matches!(self, Verdict::Odol)
    }
}

#[derive(Clone, Debug)]
pub struct FrameClassifier {
    vehicle_labels: BTreeSet<String>,
    cargo_label: String,
    association_iou: f32,
}

impl FrameClassifier {
    pub fn new(
        vehicle_labels: BTreeSet<String>,
        cargo_label: impl Into<String>,
        association_iou: f32,
    ) -> Self {
        Self {
            vehicle_labels,
            cargo_label: cargo_label.into(),
            association_iou,
        }
    }

    /// Splits a frame's detections, preserving input order.
    ///
    /// Labels that are neither a vehicle class nor the cargo class are dropped.
    pub fn partition<I>(&self, detections: I) -> Partition
    where
        I: IntoIterator<Item = Detection>,
    {
        let mut partition = Partition::default();
        for det in detections {
            if self.vehicle_labels.contains(&det.label) {
                partition.vehicles.push(det);
            } else if det.label == self.cargo_label {
                partition.cargo.push(det);
            }
        }
        partition
    }

    /// True when any cargo region overlaps the vehicle above the association
    /// threshold.
    pub fn is_odol(&self, vehicle: &Detection, cargo: &[Detection]) -> bool {
        cargo
            .iter()
            .any(|c| iou(&vehicle.bbox, &c.bbox) > self.association_iou)
    }

    pub fn classify(&self, vehicle: &Detection, cargo: &[Detection]) -> Verdict {
        Verdict::from_odol(self.is_odol(vehicle, cargo))
    }
}
