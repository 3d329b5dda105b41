//! Zone evaluation for detections

use serde::Serialize;
use tracing::{debug, info};

use crate::geometry::Point;
use crate::zone::Zone;
use crate::GeofenceError;

/// Anything with a reference point that can be tested against a zone
pub trait Anchored {
    fn anchor(&self) -> Point;
}

/// Containment result for one detection
#[derive(Debug, Clone, Serialize)]
pub struct ZoneVerdict<D> {
    /// The evaluated detection
    pub detection: D,
    /// Inside at least one zone
    pub inside: bool,
    /// Indices of the zones containing the anchor
    pub zone_hits: Vec<usize>,
}

/// Evaluates detections against all configured zones.
///
/// Multiple zones combine with union semantics: a detection is breaching
/// when its anchor lies inside any zone.
#[derive(Debug, Clone)]
pub struct GeofenceEngine {
    zones: Vec<Zone>,
}

impl GeofenceEngine {
    /// Create an engine over one or more validated zones
    pub fn new(zones: Vec<Zone>) -> Result<Self, GeofenceError> {
        if zones.is_empty() {
            return Err(GeofenceError::NoZones);
        }
        info!(
            "Geofence armed with {} zone(s): {:?}",
            zones.len(),
            zones.iter().map(Zone::name).collect::<Vec<_>>()
        );
        Ok(Self { zones })
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Name of the zone at `index`
    pub fn zone_name(&self, index: usize) -> Option<&str> {
        self.zones.get(index).map(Zone::name)
    }

    /// Produce a verdict for every detection, preserving input order
    pub fn evaluate<D: Anchored>(&self, detections: Vec<D>) -> Vec<ZoneVerdict<D>> {
        detections
            .into_iter()
            .map(|detection| {
                let anchor = detection.anchor();
                let zone_hits: Vec<usize> = self
                    .zones
                    .iter()
                    .enumerate()
                    .filter(|(_, zone)| zone.contains(anchor))
                    .map(|(i, _)| i)
                    .collect();

                if !zone_hits.is_empty() {
                    debug!("Anchor ({:.1}, {:.1}) inside zones {:?}", anchor.x, anchor.y, zone_hits);
                }

                ZoneVerdict {
                    inside: !zone_hits.is_empty(),
                    zone_hits,
                    detection,
                }
            })
            .collect()
    }
}

/// Number of breaching verdicts
pub fn breach_count<D>(verdicts: &[ZoneVerdict<D>]) -> usize {
    verdicts.iter().filter(|v| v.inside).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    impl Anchored for Point {
        fn anchor(&self) -> Point {
            *self
        }
    }

    fn rect(name: &str, x0: f32, y0: f32, x1: f32, y1: f32) -> Zone {
        Zone::new(
            name,
            vec![
                Point::new(x0, y0),
                Point::new(x1, y0),
                Point::new(x1, y1),
                Point::new(x0, y1),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_requires_a_zone() {
        assert_eq!(GeofenceEngine::new(vec![]).unwrap_err(), GeofenceError::NoZones);
    }

    #[test]
    fn test_union_semantics() {
        let engine = GeofenceEngine::new(vec![
            rect("left", 0.0, 0.0, 10.0, 10.0),
            rect("right", 20.0, 0.0, 30.0, 10.0),
        ])
        .unwrap();

        let verdicts = engine.evaluate(vec![
            Point::new(5.0, 5.0),
            Point::new(15.0, 5.0),
            Point::new(25.0, 5.0),
        ]);

        assert_eq!(verdicts.len(), 3);
        assert!(verdicts[0].inside);
        assert_eq!(verdicts[0].zone_hits, vec![0]);
        assert!(!verdicts[1].inside);
        assert!(verdicts[1].zone_hits.is_empty());
        assert!(verdicts[2].inside);
        assert_eq!(engine.zone_name(verdicts[2].zone_hits[0]), Some("right"));
        assert_eq!(breach_count(&verdicts), 2);
    }

    #[test]
    fn test_overlapping_zones_report_all_hits() {
        let engine = GeofenceEngine::new(vec![
            rect("outer", 0.0, 0.0, 100.0, 100.0),
            rect("inner", 40.0, 40.0, 60.0, 60.0),
        ])
        .unwrap();

        let verdicts = engine.evaluate(vec![Point::new(50.0, 50.0)]);
        assert_eq!(verdicts[0].zone_hits, vec![0, 1]);
    }

    #[test]
    fn test_outside_detections_are_retained() {
        let engine = GeofenceEngine::new(vec![rect("door", 0.0, 0.0, 10.0, 10.0)]).unwrap();
        let verdicts = engine.evaluate(vec![Point::new(50.0, 50.0), Point::new(60.0, 60.0)]);
        assert_eq!(verdicts.len(), 2);
        assert_eq!(breach_count(&verdicts), 0);
        assert_eq!(verdicts[1].detection, Point::new(60.0, 60.0));
    }
}
