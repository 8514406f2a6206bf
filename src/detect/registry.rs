use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};

use crate::detect::result::Detection;
use crate::frame::FrameView;
use crate::ingest::rgb_frame_len;
use crate::labels::ClassLabels;

use super::backend::DetectorBackend;

/// Default minimum confidence for a detection to reach the classifier.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// Thread-safe registry of detector backends.
///
/// Backends are wrapped in `Mutex` because `DetectorBackend::detect` takes `&mut self`.
/// Detections from the default backend are filtered by confidence and their
/// class ids resolved through the label table.
pub struct BackendRegistry {
    backends: HashMap<String, Arc<Mutex<dyn DetectorBackend>>>,
    default_name: Option<String>,
    labels: ClassLabels,
    min_confidence: f32,
}

impl BackendRegistry {
    pub fn new(labels: ClassLabels, min_confidence: f32) -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
            labels,
            min_confidence,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(Mutex::new(backend)));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    /// Get backend by name.
    pub fn get(&self, name: &str) -> Option<Arc<Mutex<dyn DetectorBackend>>> {
        self.backends.get(name).cloned()
    }

    /// Get default backend.
    pub fn default_backend(&self) -> Option<Arc<Mutex<dyn DetectorBackend>>> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// Warm up every registered backend.
    pub fn warm_up(&self) -> Result<()> {
        for (name, backend) in &self.backends {
            let mut guard = backend
                .lock()
                .map_err(|_| anyhow!("backend '{}' lock poisoned", name))?;
            guard.warm_up()?;
        }
        Ok(())
    }

    /// Run the default backend and return labelled detections at or above
    /// the confidence threshold.
    pub fn detect(&self, frame: &FrameView<'_>) -> Result<Vec<Detection>> {
        let expected = rgb_frame_len(frame.width(), frame.height())?;
        if frame.pixels().len() != expected {
            bail!(
                "frame {} holds {} bytes, expected {} for {}x{} RGB",
                frame.index(),
                frame.pixels().len(),
                expected,
                frame.width(),
                frame.height()
            );
        }
        let backend = self
            .default_backend()
            .ok_or_else(|| anyhow!("no detector backend registered"))?;
        let raw = {
            let mut guard = backend
                .lock()
                .map_err(|_| anyhow!("backend lock poisoned"))?;
            guard.detect(frame)?
        };
        Ok(raw
            .into_iter()
            .filter(|det| det.confidence >= self.min_confidence)
            .map(|det| Detection::new(self.labels.describe(det.class_id), det.bbox, det.confidence))
            .collect())
    }

    /// Whether the default backend has run out of detections.
    pub fn is_exhausted(&self) -> Result<bool> {
        let Some(backend) = self.default_backend() else {
            return Ok(false);
        };
        let guard = backend
            .lock()
            .map_err(|_| anyhow!("backend lock poisoned"))?;
        Ok(guard.is_exhausted())
    }

    /// Throughput of the default backend, `0.0` when none is registered.
    pub fn network_fps(&self) -> Result<f32> {
        let Some(backend) = self.default_backend() else {
            return Ok(0.0);
        };
        let guard = backend
            .lock()
            .map_err(|_| anyhow!("backend lock poisoned"))?;
        Ok(guard.network_fps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::{ReplayBackend, StubBackend};
    use crate::detect::result::RawDetection;
    use crate::frame::{test_frame, Frame};
    use crate::geometry::BoundingBox;

    fn raw(class_id: u32, confidence: f32) -> RawDetection {
        RawDetection {
            class_id,
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            confidence,
        }
    }

    #[test]
    fn detect_filters_confidence_and_resolves_labels() -> Result<()> {
        let labels = ClassLabels::new(["BACKGROUND", "box_truck", "overdimension_load"]);
        let mut registry = BackendRegistry::new(labels, DEFAULT_MIN_CONFIDENCE);
        registry.register(ReplayBackend::from_frames(vec![vec![
            raw(1, 0.9),
            raw(2, 0.49),
            raw(2, 0.5),
            raw(9, 0.7),
        ]]));

        let dets = registry.detect(&test_frame(0).view())?;
        let labels: Vec<_> = dets.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["box_truck", "overdimension_load", "class_9"]);
        Ok(())
    }

    #[test]
    fn first_registered_is_default() -> Result<()> {
        let mut registry = BackendRegistry::new(ClassLabels::default(), DEFAULT_MIN_CONFIDENCE);
        registry.register(StubBackend::default());
        registry.register(ReplayBackend::from_frames(vec![]));
        assert_eq!(registry.default_name(), Some("stub"));

        registry.set_default("replay")?;
        assert_eq!(registry.default_name(), Some("replay"));
        assert!(registry.detect(&test_frame(0).view())?.is_empty());
        assert!(registry.set_default("tensorrt").is_err());
        Ok(())
    }

    #[test]
    fn detect_rejects_short_pixel_buffer() {
        let mut registry = BackendRegistry::new(ClassLabels::default(), DEFAULT_MIN_CONFIDENCE);
        registry.register(ReplayBackend::from_frames(vec![vec![raw(1, 0.9)]]));
        let truncated = Frame::new(vec![0u8; 5], 4, 4, 0);
        assert!(registry.detect(&truncated.view()).is_err());
        assert!(registry.detect(&test_frame(0).view()).is_ok());
    }

    #[test]
    fn detect_without_backend_fails() {
        let registry = BackendRegistry::new(ClassLabels::default(), DEFAULT_MIN_CONFIDENCE);
        assert!(registry.detect(&test_frame(0).view()).is_err());
        assert_eq!(registry.network_fps().ok(), Some(0.0));
    }
}
