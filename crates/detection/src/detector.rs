//! Detector boundary

use camera_capture::VideoFrame;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::object::{BoundingBox, Detection};
use crate::DetectionError;

/// Object detector collaborator.
///
/// Model internals are opaque to the pipeline; an empty result is valid.
pub trait Detector: Send {
    /// Detector identifier
    fn name(&self) -> &str;

    /// Run detection on a frame
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<Detection>, DetectionError>;
}

/// Raw detection as written in a script: corner box, like YOLO `xyxy` output
#[derive(Debug, Clone, Deserialize)]
struct ScriptDetection {
    label: String,
    confidence: f32,
    #[serde(rename = "box")]
    corners: [f32; 4],
}

#[derive(Debug, Clone, Deserialize)]
struct ScriptEntry {
    frame: u64,
    #[serde(default)]
    detections: Vec<ScriptDetection>,
    #[serde(default)]
    error: Option<String>,
}

enum ScriptedOutcome {
    Detections(Vec<Detection>),
    Failure(String),
}

/// Replays per-frame detections from a JSON script.
///
/// Stands in for a real model when running without one. Frames absent from
/// the script produce no detections.
///
/// ```json
/// [
///   { "frame": 3, "detections": [{ "label": "knife", "confidence": 0.9, "box": [10, 20, 60, 140] }] },
///   { "frame": 9, "error": "timeout" }
/// ]
/// ```
pub struct ScriptedDetector {
    script: HashMap<u64, ScriptedOutcome>,
    invocations: Vec<u64>,
}

impl ScriptedDetector {
    /// Parse a JSON script
    pub fn from_json(json: &str) -> Result<Self, DetectionError> {
        let entries: Vec<ScriptEntry> =
            serde_json::from_str(json).map_err(|e| DetectionError::Script(e.to_string()))?;

        let script = entries
            .into_iter()
            .map(|entry| {
                let outcome = match entry.error {
                    Some(reason) => ScriptedOutcome::Failure(reason),
                    None => ScriptedOutcome::Detections(
                        entry
                            .detections
                            .into_iter()
                            .map(|d| {
                                let [x1, y1, x2, y2] = d.corners;
                                Detection::new(d.label, d.confidence, BoundingBox::from_corners(x1, y1, x2, y2))
                            })
                            .collect(),
                    ),
                };
                (entry.frame, outcome)
            })
            .collect::<HashMap<_, _>>();

        info!("Scripted detector loaded with {} frame entries", script.len());
        Ok(Self {
            script,
            invocations: Vec::new(),
        })
    }

    /// Load a JSON script from disk
    pub fn from_path(path: &Path) -> Result<Self, DetectionError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| DetectionError::Script(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// A detector that never sees anything
    pub fn empty() -> Self {
        Self {
            script: HashMap::new(),
            invocations: Vec::new(),
        }
    }

    /// Script a frame's detections
    pub fn with_frame(mut self, sequence: u64, detections: Vec<Detection>) -> Self {
        self.script.insert(sequence, ScriptedOutcome::Detections(detections));
        self
    }

    /// Script a frame's failure
    pub fn with_failure(mut self, sequence: u64, reason: impl Into<String>) -> Self {
        self.script.insert(sequence, ScriptedOutcome::Failure(reason.into()));
        self
    }

    /// Frame sequence numbers the detector was called on
    pub fn invocations(&self) -> &[u64] {
        &self.invocations
    }
}

impl Detector for ScriptedDetector {
    fn name(&self) -> &str {
        "scripted"
    }

    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<Detection>, DetectionError> {
        self.invocations.push(frame.sequence);
        match self.script.get(&frame.sequence) {
            Some(ScriptedOutcome::Detections(detections)) => {
                debug!("Frame {}: {} scripted detections", frame.sequence, detections.len());
                Ok(detections.clone())
            }
            Some(ScriptedOutcome::Failure(reason)) => Err(DetectionError::Inference(reason.clone())),
            None => Ok(Vec::new()),
        }
    }
}
