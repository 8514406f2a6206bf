use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detect::backend::DetectorBackend;
use crate::detect::fps::FpsMeter;
use crate::detect::result::RawDetection;
use crate::frame::FrameView;
use crate::geometry::BoundingBox;
use crate::labels::ClassLabels;

/// Synthetic traffic for the stub backend.
#[derive(Clone, Debug)]
pub struct StubScene {
    pub vehicle_class_id: u32,
    pub cargo_class_id: u32,
    pub vehicle_width: f32,
    pub vehicle_height: f32,
    /// Frames each vehicle stays in view.
    pub dwell_frames: u64,
    /// Maximum per-frame jitter of a box, in pixels.
    pub jitter_px: f32,
    pub seed: u64,
}

impl Default for StubScene {
    fn default() -> Self {
        Self {
            vehicle_class_id: 1,
            cargo_class_id: 2,
            vehicle_width: 160.0,
            vehicle_height: 120.0,
            dwell_frames: 15,
            jitter_px: 2.0,
            seed: 7,
        }
    }
}

impl StubScene {
    /// Scene whose class ids match `vehicle` and `cargo` in `labels`.
    pub fn for_labels(labels: &ClassLabels, vehicle: &str, cargo: &str) -> Result<Self> {
        let vehicle_class_id = labels
            .id_of(vehicle)
            .ok_or_else(|| anyhow!("label table has no vehicle class '{}'", vehicle))?;
        let cargo_class_id = labels
            .id_of(cargo)
            .ok_or_else(|| anyhow!("label table has no cargo class '{}'", cargo))?;
        Ok(Self {
            vehicle_class_id,
            cargo_class_id,
            ..Self::default()
        })
    }
}

/// Deterministic detector for running without a model.
///
/// Vehicle `k` occupies frames `k * dwell_frames ..` and sits in grid slot
/// `k % slots`, jittering by a few pixels between frames. Odd vehicles carry a
/// cargo region covering the upper part of their box.
///
/// Each pass over the grid shifts by half a cell (right, down, then both) so
/// a new pass does not land on boxes already counted. Four passes exhaust the
/// distinct positions: from vehicle `4 * slots` on, every box repeats an
/// earlier one and the counted-box registry reports it as a re-detection.
pub struct StubBackend {
    scene: StubScene,
    rng: StdRng,
    fps: FpsMeter,
}

impl StubBackend {
    pub fn new(scene: StubScene) -> Self {
        let rng = StdRng::seed_from_u64(scene.seed);
        Self {
            scene,
            rng,
            fps: FpsMeter::new(),
        }
    }

    fn slot_origin(&self, vehicle: u64, width: u32, height: u32) -> (f32, f32) {
        let pad = self.scene.jitter_px.max(0.0);
        let cell_w = self.scene.vehicle_width + 2.0 * pad;
        let cell_h = self.scene.vehicle_height + 2.0 * pad;
        let cols = ((width as f32 / cell_w).floor() as u64).max(1);
        let rows = ((height as f32 / cell_h).floor() as u64).max(1);
        let slots = cols * rows;
        let slot = vehicle % slots;
        let pass = (vehicle / slots) % 4;
        let shift_x = (pass % 2) as f32 * cell_w / 2.0;
        let shift_y = (pass / 2) as f32 * cell_h / 2.0;
        (
            (slot % cols) as f32 * cell_w + pad + shift_x,
            (slot / cols) as f32 * cell_h + pad + shift_y,
        )
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new(StubScene::default())
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &FrameView<'_>) -> Result<Vec<RawDetection>> {
        self.fps.tick();

        let vehicle = frame.index() / self.scene.dwell_frames.max(1);
        let (x, y) = self.slot_origin(vehicle, frame.width(), frame.height());
        let jitter = self.scene.jitter_px;
        let (dx, dy) = if jitter > 0.0 {
            (
                self.rng.gen_range(-jitter..=jitter),
                self.rng.gen_range(-jitter..=jitter),
            )
        } else {
            (0.0, 0.0)
        };
        let bbox = BoundingBox::new(
            x,
            y,
            x + self.scene.vehicle_width,
            y + self.scene.vehicle_height,
        )
        .translate(dx, dy);

        let mut detections = vec![RawDetection {
            class_id: self.scene.vehicle_class_id,
            bbox,
            confidence: 0.9,
        }];
        if vehicle % 2 == 1 {
            let cargo = BoundingBox::new(
                bbox.left + 0.1 * bbox.width(),
                bbox.top,
                bbox.right - 0.1 * bbox.width(),
                bbox.top + 0.6 * bbox.height(),
            );
            detections.push(RawDetection {
                class_id: self.scene.cargo_class_id,
                bbox: cargo,
                confidence: 0.8,
            });
        }
        Ok(detections)
    }

    fn network_fps(&self) -> f32 {
        self.fps.fps()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Aggregator, Decision};
    use crate::classify::Verdict;
    use crate::frame::{test_frame, Frame};
    use crate::geometry::iou;
    use crate::tracker::DEFAULT_DUPLICATE_IOU;

    #[test]
    fn vehicle_holds_position_while_in_view() -> Result<()> {
        let mut backend = StubBackend::default();
        let a = backend.detect(&test_frame(0).view())?;
        let b = backend.detect(&test_frame(1).view())?;
        assert_eq!(a.len(), 1);
        assert!(iou(&a[0].bbox, &b[0].bbox) > 0.8);
        Ok(())
    }

    #[test]
    fn odd_vehicles_carry_cargo() -> Result<()> {
        let mut backend = StubBackend::default();
        let dwell = StubScene::default().dwell_frames;
        let dets = backend.detect(&test_frame(dwell).view())?;
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[1].class_id, StubScene::default().cargo_class_id);
        // cargo covers 0.8 * 0.6 of the vehicle box
        assert!(iou(&dets[0].bbox, &dets[1].bbox) > 0.3);
        Ok(())
    }

    #[test]
    fn later_passes_keep_counting() -> Result<()> {
        // 1280x720 fits 7x5 slots of the default scene.
        let slots = 35;
        let scene = StubScene::default();
        let dwell = scene.dwell_frames;
        let mut backend = StubBackend::new(scene);
        let aggregator = Aggregator::new();
        for vehicle in 0..4 * slots {
            let frame = Frame::new(Vec::new(), 1280, 720, vehicle * dwell);
            let dets = backend.detect(&frame.view())?;
            let decision =
                aggregator.observe(dets[0].bbox, Verdict::Normal, DEFAULT_DUPLICATE_IOU)?;
            assert_eq!(decision, Decision::Counted(Verdict::Normal), "vehicle {}", vehicle);
        }

        let frame = Frame::new(Vec::new(), 1280, 720, 4 * slots * dwell);
        let dets = backend.detect(&frame.view())?;
        let decision =
            aggregator.observe(dets[0].bbox, Verdict::Normal, DEFAULT_DUPLICATE_IOU)?;
        assert_eq!(decision, Decision::Duplicate);
        Ok(())
    }

    #[test]
    fn for_labels_resolves_ids() -> Result<()> {
        let labels = ClassLabels::new(["BACKGROUND", "overdimension_load", "box_truck"]);
        let scene = StubScene::for_labels(&labels, "box_truck", "overdimension_load")?;
        assert_eq!(scene.vehicle_class_id, 2);
        assert_eq!(scene.cargo_class_id, 1);
        assert!(StubScene::for_labels(&labels, "tank_truck", "overdimension_load").is_err());
        Ok(())
    }
}
