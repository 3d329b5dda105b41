//! Camera Capture Library for the Threat Pipeline
//!
//! Provides the video frame type and the frame source boundary.
//! Supports:
//! - Synthetic blank frames (bench and dry runs)
//! - Replaying a directory of still images as a video feed

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{FrameSource, ImageSequenceSource, SyntheticSource};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open source: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Frame decode failed: {0}")]
    Decode(String),

    #[error("Streaming error: {0}")]
    Stream(String),
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Target FPS (0 = run as fast as frames arrive)
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl CameraConfig {
    /// Frame budget derived from the target FPS
    pub fn frame_budget(&self) -> Option<std::time::Duration> {
        if self.fps == 0 {
            None
        } else {
            Some(std::time::Duration::from_micros(1_000_000 / self.fps as u64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_budget() {
        let config = CameraConfig::default();
        assert_eq!(config.frame_budget(), Some(std::time::Duration::from_micros(33_333)));

        let unpaced = CameraConfig { fps: 0, ..Default::default() };
        assert!(unpaced.frame_budget().is_none());
    }
}
