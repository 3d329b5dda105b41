//! Alerting System
//!
//! Decides when a breach becomes an alert, and carries out the alert's side
//! effects (evidence snapshot, audible alarm) off the frame loop.

mod executor;
mod sinks;
mod state;

pub use executor::{AlertExecutor, DispatchOutcome, ExecutionReport, ShutdownReport};
pub use sinks::{AlarmPlayer, FsSnapshotStore, SilentAlarm, SnapshotStore, SystemAlarm};
pub use state::{AlertEvent, AlertPhase, AlertState, AlertStateMachine};

use thiserror::Error;

/// Alert side-effect errors
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Snapshot write failed: {0}")]
    Snapshot(String),

    #[error("Alarm playback failed: {0}")]
    Alarm(String),

    #[error("Alert worker failed: {0}")]
    Worker(String),
}
