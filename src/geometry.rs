//! Axis-aligned boxes in frame pixel coordinates and their overlap.

use serde::{Deserialize, Serialize};

/// Added to the union so two degenerate boxes never divide by zero.
pub const IOU_EPSILON: f32 = 1e-6;

/// Axis-aligned bounding box in frame pixel coordinates.
///
/// Zero-area boxes are valid and overlap nothing. Inverted boxes are not
/// rejected; their clamped intersection is zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Builds a box from `[left, top, right, bottom]`.
    pub fn from_ltrb(ltrb: [f32; 4]) -> Self {
        Self::new(ltrb[0], ltrb[1], ltrb[2], ltrb[3])
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Area shared with `other`, zero when the boxes do not overlap.
    pub fn intersection(&self, other: &BoundingBox) -> f32 {
        let ix0 = self.left.max(other.left);
        let iy0 = self.top.max(other.top);
        let ix1 = self.right.min(other.right);
        let iy1 = self.bottom.min(other.bottom);
        (ix1 - ix0).max(0.0) * (iy1 - iy0).max(0.0)
    }

    /// Intersection over union with `other`. See [`iou`].
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        iou(self, other)
    }

    /// Shifts the box by `(dx, dy)` pixels.
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(
            self.left + dx,
            self.top + dy,
            self.right + dx,
            self.bottom + dy,
        )
    }
}

/// Intersection over union of two boxes.
///
/// Returns `intersection / (union + IOU_EPSILON)`, which is always finite and
/// falls in `[0, 1]` for non-degenerate boxes.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let intersection = a.intersection(b);
    let union = a.area() + b.area() - intersection;
    intersection / (union + IOU_EPSILON)
}
