//! Breach state machine

use camera_capture::VideoFrame;
use detection::Detection;
use geofence::ZoneVerdict;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Alert phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum AlertPhase {
    /// No recent breach
    #[default]
    Idle,
    /// A breach is active and its alert has fired
    Breached,
    /// Breach ended recently; re-alerting is held back until it expires
    Cooldown,
}

impl AlertPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertPhase::Idle => "idle",
            AlertPhase::Breached => "breached",
            AlertPhase::Cooldown => "cooldown",
        }
    }
}

/// State of the alert machine
#[derive(Debug, Clone, Default)]
pub struct AlertState {
    /// Current phase
    pub phase: AlertPhase,
    /// Last time an alert event fired
    pub last_trigger_time: Option<Instant>,
    /// End of the current cooldown; `None` while cooling down means no expiry
    pub cooldown_until: Option<Instant>,
}

/// One alert, created on entry into `Breached`
#[derive(Debug, Clone)]
pub struct AlertEvent {
    /// Monotonic event number, starting at 1
    pub id: u64,
    /// When the breach was confirmed
    pub trigger_time: Instant,
    /// Inside-zone detections that caused the alert, in detection order
    pub triggering_detections: Vec<Detection>,
    /// Frame captured at the moment of the breach
    pub snapshot_frame: VideoFrame,
}

impl AlertEvent {
    /// Evidence file name, derived from the frame's capture second
    pub fn snapshot_name(&self) -> String {
        format!("threat_{}.jpg", self.snapshot_frame.timestamp_secs())
    }

    /// Comma-separated labels of the triggering detections
    pub fn labels(&self) -> String {
        self.triggering_detections
            .iter()
            .map(|d| d.class_label.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Decides when breaches become alert events.
///
/// Pure decision logic: the caller supplies the clock and carries out the
/// returned event. Cooldown only suppresses repeat alerts while no threat
/// is present; a breach during cooldown fires immediately.
#[derive(Debug)]
pub struct AlertStateMachine {
    cooldown: Duration,
    state: AlertState,
    events_emitted: u64,
}

impl AlertStateMachine {
    /// Create a machine in `Idle`
    pub fn new(cooldown: Duration) -> Self {
        info!("Alert state machine: cooldown {:?}", cooldown);
        Self {
            cooldown,
            state: AlertState::default(),
            events_emitted: 0,
        }
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    pub fn phase(&self) -> AlertPhase {
        self.state.phase
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Number of events emitted so far
    pub fn events_emitted(&self) -> u64 {
        self.events_emitted
    }

    /// Advance one cycle
    pub fn update(
        &mut self,
        verdicts: &[ZoneVerdict<Detection>],
        frame: &VideoFrame,
        now: Instant,
    ) -> Option<AlertEvent> {
        let breaching = verdicts.iter().any(|v| v.inside);

        match (self.state.phase, breaching) {
            (AlertPhase::Idle, true) | (AlertPhase::Cooldown, true) => {
                Some(self.fire(verdicts, frame, now))
            }
            (AlertPhase::Breached, true) => None,
            (AlertPhase::Breached, false) => {
                // unrepresentable end: cool down until the next breach
                let until = now.checked_add(self.cooldown);
                debug!("Breach cleared, cooling down for {:?}", self.cooldown);
                self.state.phase = AlertPhase::Cooldown;
                self.state.cooldown_until = until;
                None
            }
            (AlertPhase::Cooldown, false) => {
                if self.state.cooldown_until.map_or(false, |until| now >= until) {
                    info!("Cooldown expired, system idle");
                    self.state.phase = AlertPhase::Idle;
                    self.state.cooldown_until = None;
                }
                None
            }
            (AlertPhase::Idle, false) => None,
        }
    }

    fn fire(
        &mut self,
        verdicts: &[ZoneVerdict<Detection>],
        frame: &VideoFrame,
        now: Instant,
    ) -> AlertEvent {
        if self.state.phase == AlertPhase::Cooldown {
            info!("Renewed breach during cooldown, re-alerting");
        }

        self.events_emitted += 1;
        self.state.phase = AlertPhase::Breached;
        self.state.last_trigger_time = Some(now);
        self.state.cooldown_until = None;

        AlertEvent {
            id: self.events_emitted,
            trigger_time: now,
            triggering_detections: verdicts
                .iter()
                .filter(|v| v.inside)
                .map(|v| v.detection.clone())
                .collect(),
            snapshot_frame: frame.clone(),
        }
    }
}
