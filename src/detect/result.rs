use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// Backend output before class ids are resolved to labels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub class_id: u32,
    /// `[left, top, right, bottom]` in frame pixels.
    #[serde(with = "ltrb")]
    pub bbox: BoundingBox,
    pub confidence: f32,
}

/// A labelled detection, valid for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub label: String,
    pub confidence: f32,
}

impl Detection {
    pub fn new(label: impl Into<String>, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            bbox,
            label: label.into(),
            confidence,
        }
    }
}

mod ltrb {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::geometry::BoundingBox;

    pub fn serialize<S: Serializer>(bbox: &BoundingBox, s: S) -> Result<S::Ok, S::Error> {
        [bbox.left, bbox.top, bbox.right, bbox.bottom].serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BoundingBox, D::Error> {
        let raw = <[f32; 4]>::deserialize(d)?;
        Ok(BoundingBox::from_ltrb(raw))
    }
}
