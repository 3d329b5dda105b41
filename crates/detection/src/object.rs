//! Detected objects

use geofence::{Anchored, Point};
use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixels, origin at the top-left corner
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Build from `[x1, y1, x2, y2]` corners as most detectors emit them
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            w: (x2 - x1).abs(),
            h: (y2 - y1).abs(),
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Middle of the bottom edge, where a standing object meets the ground
    pub fn bottom_center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h)
    }
}

/// Which point of a box is tested against zones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorPolicy {
    #[default]
    BottomCenter,
    Center,
}

impl AnchorPolicy {
    pub fn anchor_of(&self, bbox: &BoundingBox) -> Point {
        match self {
            AnchorPolicy::BottomCenter => bbox.bottom_center(),
            AnchorPolicy::Center => bbox.center(),
        }
    }
}

/// Detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label (e.g. "person", "knife")
    pub class_label: String,

    /// Detection confidence (0-1)
    pub confidence: f32,

    /// Bounding box
    pub bbox: BoundingBox,

    /// Reference point for zone containment
    pub anchor: Point,
}

impl Detection {
    /// Create a detection anchored at the bottom-center of its box
    pub fn new(class_label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_label: class_label.into(),
            confidence,
            anchor: AnchorPolicy::default().anchor_of(&bbox),
            bbox,
        }
    }

    /// Replace the anchor with an explicit point
    pub fn with_anchor(mut self, anchor: Point) -> Self {
        self.anchor = anchor;
        self
    }
}

impl Anchored for Detection {
    fn anchor(&self) -> Point {
        self.anchor
    }
}
