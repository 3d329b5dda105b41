//! Sentry: threat detection and alert orchestration
//!
//! Wires the frame source, the detector, filtering, the geofence and the
//! alert state machine into one frame loop, with alert side effects carried
//! out off the loop.

pub mod config;
pub mod pipeline;
pub mod render;

pub use config::{ConfigError, LogFormat, SentryConfig, SentrySettings};
pub use pipeline::{Collaborators, CycleOutcome, Pipeline, PipelineStats};
pub use render::{CycleView, FrameRenderer, LogRenderer, NullRenderer};

use alerting::AlertError;
use camera_capture::CameraError;
use detection::DetectionError;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Frame source failed: {0}")]
    Source(#[from] CameraError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Detector setup failed: {0}")]
    Detector(#[from] DetectionError),

    #[error("Alert setup failed: {0}")]
    Alert(#[from] AlertError),
}

/// Initialize logging; `RUST_LOG` overrides the default `info` level
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    if let Err(e) = result {
        eprintln!("Tracing subscriber already set: {}", e);
    }
}
