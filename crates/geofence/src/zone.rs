//! Danger zone definitions

use serde::Serialize;
use tracing::debug;

use crate::geometry::{contains, signed_area, Point};
use crate::GeofenceError;

/// Minimum absolute area (square pixels) for a usable zone
const MIN_ZONE_AREA: f64 = 1e-3;

/// Margin of the default zone on each side, as a fraction of the frame
const DEFAULT_ZONE_MARGIN: f32 = 0.25;

/// Immutable polygon marking a region where detections count as threats.
///
/// Construction validates the polygon, so a `Zone` in hand always has at
/// least 3 finite vertices and non-zero area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Zone {
    name: String,
    vertices: Vec<Point>,
    area: f64,
}

impl Zone {
    /// Create a zone from pixel-space vertices
    pub fn new(name: impl Into<String>, vertices: Vec<Point>) -> Result<Self, GeofenceError> {
        let name = name.into();

        if vertices.len() < 3 {
            return Err(GeofenceError::TooFewVertices {
                zone: name,
                count: vertices.len(),
            });
        }
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(GeofenceError::NonFiniteVertex { zone: name });
        }

        let area = signed_area(&vertices).abs();
        if area < MIN_ZONE_AREA {
            return Err(GeofenceError::ZeroArea { zone: name, area });
        }

        debug!("Zone '{}' configured: {} vertices, area {:.1}", name, vertices.len(), area);
        Ok(Self {
            name,
            vertices,
            area,
        })
    }

    /// Create a zone from vertices in `[0, 1]` frame coordinates
    pub fn normalized(
        name: impl Into<String>,
        vertices: &[Point],
        width: u32,
        height: u32,
    ) -> Result<Self, GeofenceError> {
        let name = name.into();

        if width == 0 || height == 0 {
            return Err(GeofenceError::InvalidFrameSize { width, height });
        }
        let in_range = |v: f32| (0.0..=1.0).contains(&v);
        if vertices.iter().any(|v| !in_range(v.x) || !in_range(v.y)) {
            return Err(GeofenceError::OutOfRange { zone: name });
        }

        let scaled = vertices
            .iter()
            .map(|v| Point::new(v.x * width as f32, v.y * height as f32))
            .collect();
        Self::new(name, scaled)
    }

    /// Central rectangle covering the middle half of the frame
    pub fn centered(width: u32, height: u32) -> Result<Self, GeofenceError> {
        let (lo, hi) = (DEFAULT_ZONE_MARGIN, 1.0 - DEFAULT_ZONE_MARGIN);
        Self::normalized(
            "danger",
            &[
                Point::new(lo, lo),
                Point::new(hi, lo),
                Point::new(hi, hi),
                Point::new(lo, hi),
            ],
            width,
            height,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Absolute polygon area
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Containment test (boundary counts as inside)
    pub fn contains(&self, point: Point) -> bool {
        contains(&self.vertices, point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_too_few_vertices() {
        let err = Zone::new("gate", vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]).unwrap_err();
        assert_eq!(
            err,
            GeofenceError::TooFewVertices {
                zone: "gate".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn test_rejects_collinear() {
        let result = Zone::new(
            "line",
            vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0), Point::new(10.0, 10.0)],
        );
        assert!(matches!(result, Err(GeofenceError::ZeroArea { .. })));
    }

    #[test]
    fn test_rejects_non_finite() {
        let result = Zone::new(
            "bad",
            vec![Point::new(0.0, 0.0), Point::new(f32::INFINITY, 0.0), Point::new(0.0, 1.0)],
        );
        assert!(matches!(result, Err(GeofenceError::NonFiniteVertex { .. })));
    }

    #[test]
    fn test_normalized_scaling() {
        let zone = Zone::normalized(
            "door",
            &[Point::new(0.0, 0.0), Point::new(0.5, 0.0), Point::new(0.5, 1.0)],
            640,
            480,
        )
        .unwrap();
        assert_eq!(zone.vertices()[1], Point::new(320.0, 0.0));
        assert_eq!(zone.vertices()[2], Point::new(320.0, 480.0));
    }

    #[test]
    fn test_normalized_out_of_range() {
        let result = Zone::normalized(
            "door",
            &[Point::new(0.0, 0.0), Point::new(1.5, 0.0), Point::new(0.5, 1.0)],
            640,
            480,
        );
        assert!(matches!(result, Err(GeofenceError::OutOfRange { .. })));
    }

    #[test]
    fn test_centered_zone() {
        let zone = Zone::centered(640, 480).unwrap();
        assert_eq!(zone.name(), "danger");
        assert_eq!(zone.area(), 320.0 * 240.0);
        assert!(zone.contains(Point::new(320.0, 240.0)));
        assert!(zone.contains(Point::new(160.0, 120.0)));
        assert!(!zone.contains(Point::new(100.0, 240.0)));
    }
}
