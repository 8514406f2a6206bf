//! Frame ingestion sources.
//!
//! The camera is an external collaborator. This module defines the seam the
//! pipeline captures through and ships a synthetic `stub://` source for
//! running without hardware.
//!
//! A capture may return `Ok(None)`: no frame is ready yet. That is a skip,
//! not an error, and the pipeline moves on without touching any state.

use anyhow::{anyhow, bail, Result};

use crate::frame::Frame;

pub mod synthetic;

pub use synthetic::{SyntheticConfig, SyntheticSource};

/// Largest accepted frame width or height, in pixels.
pub const MAX_FRAME_DIMENSION: u32 = 8192;

/// Byte length of a packed RGB frame, or an error when the size is out of range.
pub fn rgb_frame_len(width: u32, height: u32) -> Result<usize> {
    if width == 0 || height == 0 {
        bail!("frame size must be non-zero, got {}x{}", width, height);
    }
    if width > MAX_FRAME_DIMENSION || height > MAX_FRAME_DIMENSION {
        bail!(
            "frame size {}x{} exceeds {} pixels per side",
            width,
            height,
            MAX_FRAME_DIMENSION
        );
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(3))
        .ok_or_else(|| anyhow!("frame size {}x{} overflows a buffer length", width, height))
}

/// Capture statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub frames_skipped: u64,
    pub url: String,
}

pub trait FrameSource: Send {
    fn connect(&mut self) -> Result<()>;

    /// Next frame, or `None` when no frame is available right now.
    fn capture(&mut self) -> Result<Option<Frame>>;

    /// True once the source will never produce another frame.
    fn is_exhausted(&self) -> bool {
        false
    }

    fn stats(&self) -> SourceStats;
}

/// Opens the source for `url`.
pub fn open_source(
    url: &str,
    width: u32,
    height: u32,
    max_frames: Option<u64>,
) -> Result<Box<dyn FrameSource>> {
    if url.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(SyntheticConfig {
            url: url.to_string(),
            width,
            height,
            max_frames,
            skip_every: 0,
        })?));
    }
    bail!("unsupported frame source {}: only stub:// sources are built in", url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_frame_len_checks_bounds() {
        assert_eq!(rgb_frame_len(4, 2).ok(), Some(24));
        assert!(rgb_frame_len(0, 720).is_err());
        assert!(rgb_frame_len(40_000, 40_000).is_err());
        assert!(rgb_frame_len(MAX_FRAME_DIMENSION, MAX_FRAME_DIMENSION).is_ok());
    }

    #[test]
    fn open_source_accepts_stub_only() {
        assert!(open_source("stub://csi0", 64, 48, Some(1)).is_ok());
        assert!(open_source("csi://0", 64, 48, None).is_err());
    }
}
