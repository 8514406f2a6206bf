use anyhow::{anyhow, Result};
use std::fmt::Write as _;
use std::str::FromStr;

use crate::detect::Detection;

/// Which annotations the status sink renders per detection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Overlay {
    pub boxes: bool,
    pub labels: bool,
    pub confidence: bool,
}

impl Overlay {
    pub const NONE: Overlay = Overlay {
        boxes: false,
        labels: false,
        confidence: false,
    };

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// One line per detection, e.g. `box_truck 0.91 [0,0,10,10]`.
    pub fn render(&self, detections: &[Detection]) -> Vec<String> {
        if self.is_none() {
            return Vec::new();
        }
        detections
            .iter()
            .map(|det| {
                let mut line = String::new();
                if self.labels {
                    line.push_str(&det.label);
                }
                if self.confidence {
                    if !line.is_empty() {
                        line.push(' ');
                    }
                    let _ = write!(line, "{:.2}", det.confidence);
                }
                if self.boxes {
                    if !line.is_empty() {
                        line.push(' ');
                    }
                    let b = det.bbox;
                    let _ = write!(
                        line,
                        "[{:.0},{:.0},{:.0},{:.0}]",
                        b.left, b.top, b.right, b.bottom
                    );
                }
                line
            })
            .collect()
    }
}

impl FromStr for Overlay {
    type Err = anyhow::Error;

    /// Comma list of `box`, `labels`, `conf`, or `none`.
    fn from_str(s: &str) -> Result<Self> {
        let mut overlay = Overlay::NONE;
        for flag in s.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            match flag.to_ascii_lowercase().as_str() {
                "none" => return Ok(Overlay::NONE),
                "box" | "boxes" => overlay.boxes = true,
                "labels" | "label" => overlay.labels = true,
                "conf" | "confidence" => overlay.confidence = true,
                other => return Err(anyhow!("unknown overlay flag '{}'", other)),
            }
        }
        Ok(overlay)
    }
}
