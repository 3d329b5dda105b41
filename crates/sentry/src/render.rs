//! Per-cycle presentation boundary

use alerting::{AlertPhase, AlertState};
use camera_capture::VideoFrame;
use detection::{Detection, FrameDecision};
use geofence::ZoneVerdict;
use tracing::{debug, info, warn};

/// Everything a renderer may show for one cycle
#[derive(Debug)]
pub struct CycleView<'a> {
    pub frame: &'a VideoFrame,
    pub decision: FrameDecision,
    /// Filtered detections with their zone verdicts
    pub verdicts: &'a [ZoneVerdict<Detection>],
    pub alert: &'a AlertState,
    /// Event fired this cycle
    pub event_id: Option<u64>,
}

/// Presents cycle results; must not block the frame loop
pub trait FrameRenderer {
    fn render(&mut self, view: &CycleView<'_>);
}

/// Reports the armed status and alert phase transitions through the log
#[derive(Debug, Default)]
pub struct LogRenderer {
    last_phase: AlertPhase,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameRenderer for LogRenderer {
    fn render(&mut self, view: &CycleView<'_>) {
        let inside = view.verdicts.iter().filter(|v| v.inside).count();
        debug!(
            frame = view.frame.sequence,
            decision = ?view.decision,
            detections = view.verdicts.len(),
            inside,
            phase = view.alert.phase.as_str(),
            "cycle"
        );

        if view.alert.phase == self.last_phase {
            return;
        }
        match view.alert.phase {
            AlertPhase::Breached => warn!(
                "System: ARMED | Zone: BREACHED ({} inside)",
                inside
            ),
            AlertPhase::Cooldown => info!("System: ARMED | Zone: clear, cooling down"),
            AlertPhase::Idle => info!("System: ARMED | Zone: clear"),
        }
        self.last_phase = view.alert.phase;
    }
}

/// Renders nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl FrameRenderer for NullRenderer {
    fn render(&mut self, _view: &CycleView<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_renderer_tracks_phase() {
        let frame = VideoFrame::blank(4, 4, 0, 1);
        let mut renderer = LogRenderer::new();
        let mut alert = AlertState::default();

        renderer.render(&CycleView {
            frame: &frame,
            decision: FrameDecision::Reuse,
            verdicts: &[],
            alert: &alert,
            event_id: None,
        });
        assert_eq!(renderer.last_phase, AlertPhase::Idle);

        alert.phase = AlertPhase::Breached;
        renderer.render(&CycleView {
            frame: &frame,
            decision: FrameDecision::Infer,
            verdicts: &[],
            alert: &alert,
            event_id: Some(1),
        });
        assert_eq!(renderer.last_phase, AlertPhase::Breached);
    }
}
