//! Geofencing
//!
//! Spatial reasoning for the threat pipeline:
//! - Point-in-polygon containment (boundary counts as inside)
//! - Validated, immutable danger zones
//! - Per-detection zone verdicts with union semantics across zones

pub mod engine;
pub mod geometry;
pub mod zone;

pub use engine::{breach_count, Anchored, GeofenceEngine, ZoneVerdict};
pub use geometry::{contains, signed_area, Point};
pub use zone::Zone;

use thiserror::Error;

/// Geofence error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeofenceError {
    #[error("Zone '{zone}' needs at least 3 vertices, got {count}")]
    TooFewVertices { zone: String, count: usize },

    #[error("Zone '{zone}' has a non-finite vertex")]
    NonFiniteVertex { zone: String },

    #[error("Zone '{zone}' is degenerate (area {area})")]
    ZeroArea { zone: String, area: f64 },

    #[error("Zone '{zone}' has a normalized vertex outside [0, 1]")]
    OutOfRange { zone: String },

    #[error("Frame size {width}x{height} cannot scale a normalized zone")]
    InvalidFrameSize { width: u32, height: u32 },

    #[error("No zones configured")]
    NoZones,
}
