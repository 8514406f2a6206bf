//! Captured frames.
//!
//! - `Frame`: owned pixel buffer plus capture metadata, produced by a source.
//! - `FrameView`: borrowed view handed to detector backends.
//!
//! Pixel bytes stay private to the frame. Backends read them through the view
//! for the duration of one `detect` call and never keep them.

use std::time::Instant;

pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Zero-based position in the stream.
    pub index: u64,
    captured_at: Instant,
}

impl Frame {
    pub(crate) fn new(data: Vec<u8>, width: u32, height: u32, index: u64) -> Self {
        Self {
            data,
            width,
            height,
            index,
            captured_at: Instant::now(),
        }
    }

    pub fn view(&self) -> FrameView<'_> {
        FrameView { frame: self }
    }

    /// Milliseconds since capture.
    pub fn age_ms(&self) -> u128 {
        self.captured_at.elapsed().as_millis()
    }
}

#[derive(Clone, Copy)]
pub struct FrameView<'a> {
    frame: &'a Frame,
}

impl<'a> FrameView<'a> {
    pub fn width(&self) -> u32 {
        self.frame.width
    }

    pub fn height(&self) -> u32 {
        self.frame.height
    }

    pub fn index(&self) -> u64 {
        self.frame.index
    }

    pub fn pixels(&self) -> &'a [u8] {
        &self.frame.data
    }
}

#[cfg(test)]
pub(crate) fn test_frame(index: u64) -> Frame {
    Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_exposes_metadata() {
        let frame = Frame::new(vec![7u8; 12], 2, 2, 41);
        let view = frame.view();
        assert_eq!(view.width(), 2);
        assert_eq!(view.height(), 2);
        assert_eq!(view.index(), 41);
        assert_eq!(view.pixels(), &[7u8; 12][..]);
    }
}
