//! Skip-frame inference scheduling

use tracing::{debug, info, warn};

use crate::object::Detection;
use crate::DetectionError;

/// Default consecutive detector failures before the cached result is dropped
pub const DEFAULT_FAILURE_BUDGET: u32 = 3;

/// What to do with the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDecision {
    /// Run the detector on this frame
    Infer,
    /// Reuse the last filtered result
    Reuse,
}

/// Runs inference on every Kth frame and caches the latest filtered result
/// so skipped frames still see the objects found on the last inference.
#[derive(Debug)]
pub struct FrameScheduler {
    /// Skip interval K (>= 1)
    interval: u64,
    /// Frames seen (N)
    frame_count: u64,
    /// Frames that were scheduled for inference
    inference_count: u64,
    /// Last filtered detector output
    last_result: Vec<Detection>,
    /// Consecutive detector failures
    failures: u32,
    /// Failures tolerated before the cache is cleared
    failure_budget: u32,
}

impl FrameScheduler {
    /// Create a scheduler; `interval` must be at least 1
    pub fn new(interval: i64) -> Result<Self, DetectionError> {
        if interval < 1 {
            return Err(DetectionError::InvalidInterval(interval));
        }
        info!("Frame scheduler: inference every {} frame(s)", interval);
        Ok(Self {
            interval: interval as u64,
            frame_count: 0,
            inference_count: 0,
            last_result: Vec::new(),
            failures: 0,
            failure_budget: DEFAULT_FAILURE_BUDGET,
        })
    }

    /// Set how many consecutive detector failures keep the cached result alive
    pub fn with_failure_budget(mut self, budget: u32) -> Self {
        self.failure_budget = budget;
        self
    }

    /// Advance the frame counter and decide
    pub fn next_frame(&mut self) -> FrameDecision {
        self.frame_count += 1;
        if self.frame_count % self.interval == 0 {
            self.inference_count += 1;
            FrameDecision::Infer
        } else {
            FrameDecision::Reuse
        }
    }

    /// Store the filtered result of a successful inference
    pub fn update(&mut self, detections: Vec<Detection>) {
        self.failures = 0;
        self.last_result = detections;
    }

    /// Record a failed inference.
    ///
    /// The cached result stays valid until the failure budget is exhausted;
    /// returns `true` when this failure cleared it.
    pub fn record_failure(&mut self) -> bool {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.failure_budget && !self.last_result.is_empty() {
            warn!(
                "{} consecutive detector failures, dropping cached detections",
                self.failures
            );
            self.last_result.clear();
            return true;
        }
        debug!("Detector failure {} of {}", self.failures, self.failure_budget);
        false
    }

    /// Detections currently in effect
    pub fn last_result(&self) -> &[Detection] {
        &self.last_result
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn inference_count(&self) -> u64 {
        self.inference_count
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::BoundingBox;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_non_positive_interval() {
        assert!(matches!(FrameScheduler::new(0), Err(DetectionError::InvalidInterval(0))));
        assert!(matches!(FrameScheduler::new(-3), Err(DetectionError::InvalidInterval(-3))));
    }

    #[test]
    fn test_interval_one_infers_every_frame() {
        let mut scheduler = FrameScheduler::new(1).unwrap();
        for _ in 0..5 {
            assert_eq!(scheduler.next_frame(), FrameDecision::Infer);
        }
    }

    #[test]
    fn test_every_third_frame() {
        let mut scheduler = FrameScheduler::new(3).unwrap();
        let decisions: Vec<_> = (0..6).map(|_| scheduler.next_frame()).collect();
        assert_eq!(
            decisions,
            vec![
                FrameDecision::Reuse,
                FrameDecision::Reuse,
                FrameDecision::Infer,
                FrameDecision::Reuse,
                FrameDecision::Reuse,
                FrameDecision::Infer,
            ]
        );
    }

    #[test]
    fn test_cached_result_survives_skipped_frames() {
        let mut scheduler = FrameScheduler::new(2).unwrap();
        scheduler.next_frame();
        assert_eq!(scheduler.next_frame(), FrameDecision::Infer);
        scheduler.update(vec![Detection::new("knife", 0.9, BoundingBox::default())]);

        assert_eq!(scheduler.next_frame(), FrameDecision::Reuse);
        assert_eq!(scheduler.last_result().len(), 1);
    }

    #[test]
    fn test_failure_budget_clears_cache() {
        let mut scheduler = FrameScheduler::new(1).unwrap().with_failure_budget(2);
        scheduler.update(vec![Detection::new("knife", 0.9, BoundingBox::default())]);

        assert!(!scheduler.record_failure());
        assert_eq!(scheduler.last_result().len(), 1);
        assert!(scheduler.record_failure());
        assert!(scheduler.last_result().is_empty());

        scheduler.update(vec![]);
        assert_eq!(scheduler.consecutive_failures(), 0);
    }

    proptest! {
        #[test]
        fn prop_inference_count_is_floor(interval in 1i64..30, frames in 0u64..500) {
            let mut scheduler = FrameScheduler::new(interval).unwrap();
            let inferred = (0..frames)
                .filter(|_| scheduler.next_frame() == FrameDecision::Infer)
                .count() as u64;
            prop_assert_eq!(inferred, frames / interval as u64);
            prop_assert_eq!(scheduler.inference_count(), inferred);
        }
    }
}
