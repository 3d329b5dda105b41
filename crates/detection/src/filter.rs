//! Allow-list filter for raw detections

use std::collections::HashMap;
use tracing::{debug, info};

use crate::object::{AnchorPolicy, Detection};
use crate::DetectionError;

/// Keeps only threat-class detections that clear their class threshold.
///
/// Labels are matched case-insensitively. Kept detections are normalized:
/// lowercase label, anchor recomputed with the configured policy. Running
/// the filter on its own output returns the same set.
#[derive(Debug, Clone)]
pub struct DetectionFilter {
    thresholds: HashMap<String, f32>,
    anchor_policy: AnchorPolicy,
}

impl DetectionFilter {
    /// Validate a `label -> min confidence` mapping into a filter
    pub fn new<I, S>(thresholds: I, anchor_policy: AnchorPolicy) -> Result<Self, DetectionError>
    where
        I: IntoIterator<Item = (S, f32)>,
        S: AsRef<str>,
    {
        let mut validated = HashMap::new();
        for (label, value) in thresholds {
            let label = label.as_ref().trim().to_lowercase();
            if !(0.0..=1.0).contains(&value) {
                return Err(DetectionError::InvalidThreshold { class: label, value });
            }
            validated.insert(label, value);
        }

        if validated.is_empty() {
            return Err(DetectionError::EmptyAllowList);
        }

        info!("Detection filter: {:?} (anchor: {:?})", validated, anchor_policy);
        Ok(Self {
            thresholds: validated,
            anchor_policy,
        })
    }

    /// Threshold for a class, if allow-listed
    pub fn threshold(&self, label: &str) -> Option<f32> {
        self.thresholds.get(&label.to_lowercase()).copied()
    }

    pub fn anchor_policy(&self) -> AnchorPolicy {
        self.anchor_policy
    }

    /// Filter raw detections, preserving input order
    pub fn filter(&self, raw: &[Detection]) -> Vec<Detection> {
        let kept: Vec<Detection> = raw
            .iter()
            .filter_map(|det| {
                let label = det.class_label.to_lowercase();
                let threshold = self.thresholds.get(&label)?;
                // NaN never passes
                if !(det.confidence >= *threshold) || det.confidence > 1.0 {
                    return None;
                }
                Some(Detection {
                    class_label: label,
                    confidence: det.confidence,
                    bbox: det.bbox,
                    anchor: self.anchor_policy.anchor_of(&det.bbox),
                })
            })
            .collect();

        if kept.len() != raw.len() {
            debug!("Filter kept {}/{} detections", kept.len(), raw.len());
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::BoundingBox;
    use geofence::Point;
    use proptest::prelude::*;

    fn filter() -> DetectionFilter {
        DetectionFilter::new(
            [("person", 0.4), ("knife", 0.5), ("scissors", 0.4)],
            AnchorPolicy::Center,
        )
        .unwrap()
    }

    fn det(label: &str, confidence: f32) -> Detection {
        Detection::new(label, confidence, BoundingBox::new(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn test_threshold_validation() {
        let err = DetectionFilter::new([("knife", 1.5)], AnchorPolicy::default()).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidThreshold { .. }));

        let err = DetectionFilter::new([("knife", -0.1)], AnchorPolicy::default()).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidThreshold { .. }));

        let empty: [(&str, f32); 0] = [];
        let err = DetectionFilter::new(empty, AnchorPolicy::default()).unwrap_err();
        assert!(matches!(err, DetectionError::EmptyAllowList));

        // inclusive bounds are valid
        assert!(DetectionFilter::new([("a", 0.0), ("b", 1.0)], AnchorPolicy::default()).is_ok());
    }

    #[test]
    fn test_drops_unknown_and_weak() {
        let raw = vec![
            det("person", 0.9),
            det("cat", 0.99),
            det("knife", 0.45),
            det("knife", 0.5),
            det("scissors", f32::NAN),
        ];
        let kept = filter().filter(&raw);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].class_label, "person");
        assert_eq!(kept[1].class_label, "knife");
        assert_eq!(kept[1].confidence, 0.5);
    }

    #[test]
    fn test_normalizes_label_and_anchor() {
        let raw = vec![det("Knife", 0.8).with_anchor(Point::new(-1.0, -1.0))];
        let kept = filter().filter(&raw);

        assert_eq!(kept[0].class_label, "knife");
        assert_eq!(kept[0].anchor, Point::new(5.0, 5.0));
        assert_eq!(filter().threshold("KNIFE"), Some(0.5));
    }

    #[test]
    fn test_empty_input() {
        assert!(filter().filter(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn prop_filter_is_idempotent(
            entries in prop::collection::vec(
                (prop::sample::select(vec!["person", "Knife", "cat", "scissors", "car"]),
                 0.0f32..1.0,
                 0.0f32..600.0,
                 0.0f32..400.0),
                0..20,
            )
        ) {
            let raw: Vec<Detection> = entries
                .into_iter()
                .map(|(label, conf, x, y)| {
                    Detection::new(label, conf, BoundingBox::new(x, y, 40.0, 80.0))
                })
                .collect();

            let f = filter();
            let once = f.filter(&raw);
            let twice = f.filter(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
