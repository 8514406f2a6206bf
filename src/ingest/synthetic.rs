//! Synthetic frame source for `stub://` URLs.
//!
//! Produces blank frames at the configured size so the counting pipeline can
//! run without a camera. Every `skip_every`-th capture returns no frame,
//! matching a capture device that is momentarily not ready.

use anyhow::{anyhow, Result};

use super::{rgb_frame_len, FrameSource, SourceStats};
use crate::frame::Frame;

#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// Stop after this many frames. `None` streams forever.
    pub max_frames: Option<u64>,
    /// Return "no frame" on every n-th capture. `0` disables.
    pub skip_every: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            url: "stub://csi0".to_string(),
            width: 1280,
            height: 720,
            max_frames: None,
            skip_every: 0,
        }
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_len: usize,
    connected: bool,
    captures: u64,
    frames: u64,
    skipped: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Result<Self> {
        if !config.url.starts_with("stub://") {
            return Err(anyhow!("synthetic source requires a stub:// url, got {}", config.url));
        }
        let frame_len = rgb_frame_len(config.width, config.height)?;
        Ok(Self {
            config,
            frame_len,
            connected: false,
            captures: 0,
            frames: 0,
            skipped: 0,
        })
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            self.config.url,
            self.config.width,
            self.config.height
        );
        self.connected = true;
        Ok(())
    }

    fn capture(&mut self) -> Result<Option<Frame>> {
        if !self.connected {
            return Err(anyhow!("source {} is not connected", self.config.url));
        }
        if self.is_exhausted() {
            return Ok(None);
        }
        self.captures += 1;
        if self.config.skip_every > 0 && self.captures % self.config.skip_every == 0 {
            self.skipped += 1;
            return Ok(None);
        }

        let frame = Frame::new(
            vec![0u8; self.frame_len],
            self.config.width,
            self.config.height,
            self.frames,
        );
        self.frames += 1;
        Ok(Some(frame))
    }

    fn is_exhausted(&self) -> bool {
        matches!(self.config.max_frames, Some(max) if self.frames >= max)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frames,
            frames_skipped: self.skipped,
            url: self.config.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SyntheticConfig {
        SyntheticConfig {
            url: "stub://test".to_string(),
            width: 8,
            height: 4,
            max_frames: Some(3),
            skip_every: 0,
        }
    }

    #[test]
    fn produces_indexed_frames_until_exhausted() -> Result<()> {
        let mut source = SyntheticSource::new(config())?;
        source.connect()?;
        for expected in 0..3 {
            let frame = source.capture()?.expect("frame");
            assert_eq!(frame.index, expected);
            assert_eq!(frame.width, 8);
            assert_eq!(frame.height, 4);
        }
        assert!(source.is_exhausted());
        assert!(source.capture()?.is_none());
        assert_eq!(source.stats().frames_captured, 3);
        Ok(())
    }

    #[test]
    fn skip_every_yields_no_frame() -> Result<()> {
        let mut source = SyntheticSource::new(SyntheticConfig {
            max_frames: None,
            skip_every: 2,
            ..config()
        })?;
        source.connect()?;
        assert!(source.capture()?.is_some());
        assert!(source.capture()?.is_none());
        assert_eq!(source.capture()?.map(|f| f.index), Some(1));
        assert_eq!(source.stats().frames_skipped, 1);
        Ok(())
    }

    #[test]
    fn rejects_non_stub_url_and_unconnected_capture() -> Result<()> {
        assert!(SyntheticSource::new(SyntheticConfig {
            url: "csi://0".to_string(),
            ..config()
        })
        .is_err());

        let mut source = SyntheticSource::new(config())?;
        assert!(source.capture().is_err());
        Ok(())
    }

    #[test]
    fn rejects_oversized_frames() {
        let result = SyntheticSource::new(SyntheticConfig {
            width: 40_000,
            height: 40_000,
            ..config()
        });
        assert!(result.is_err());
    }
}
