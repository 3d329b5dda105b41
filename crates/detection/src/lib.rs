//! Threat Detection
//!
//! Everything between the raw detector output and the geofence:
//! - Detection and bounding box types
//! - Allow-list filtering with per-class confidence thresholds
//! - Skip-frame inference scheduling with a cached last result
//! - The detector boundary and a scripted stand-in detector

pub mod detector;
pub mod filter;
pub mod object;
pub mod scheduler;

pub use detector::{Detector, ScriptedDetector};
pub use filter::DetectionFilter;
pub use object::{AnchorPolicy, BoundingBox, Detection};
pub use scheduler::{FrameDecision, FrameScheduler};

use thiserror::Error;

/// Detection error types
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Confidence threshold for '{class}' must be within [0, 1], got {value}")]
    InvalidThreshold { class: String, value: f32 },

    #[error("Class allow-list is empty")]
    EmptyAllowList,

    #[error("Skip interval must be >= 1, got {0}")]
    InvalidInterval(i64),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Detection script error: {0}")]
    Script(String),
}
