use anyhow::Result;

use crate::detect::result::RawDetection;
use crate::frame::FrameView;

/// Detector backend trait.
///
/// The inference engine is an external collaborator. A backend turns one
/// frame into raw detections with numeric class ids; label resolution and the
/// confidence threshold are applied by [`super::BackendRegistry`].
///
/// Implementations must treat the frame view as read-only and must not keep
/// pixels past the `detect` call.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &FrameView<'_>) -> Result<Vec<RawDetection>>;

    /// Throughput of the backend in frames per second. Display only.
    fn network_fps(&self) -> f32;

    /// True once the backend has nothing left to report for later frames.
    /// Live backends never run out.
    fn is_exhausted(&self) -> bool {
        false
    }

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
