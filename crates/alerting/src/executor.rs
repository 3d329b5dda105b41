//! Non-blocking alert execution

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::sinks::{AlarmPlayer, SnapshotStore};
use crate::state::AlertEvent;
use crate::AlertError;

/// Completion reports buffered between polls
const REPORT_CAPACITY: usize = 16;

/// Result of handing an event to the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Placed in the empty pending slot
    Queued,
    /// Replaced a pending event that had not started
    Superseded { dropped_event: u64 },
    /// Shutdown has begun; the event was discarded
    Rejected,
}

/// Outcome of one alert execution
#[derive(Debug)]
pub struct ExecutionReport {
    pub event_id: u64,
    /// Evidence file, or why it could not be written
    pub snapshot: Result<PathBuf, AlertError>,
    /// Alarm playback result
    pub alarm: Result<(), AlertError>,
    /// Wall time spent on the side effects
    pub elapsed: Duration,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.snapshot.is_ok() && self.alarm.is_ok()
    }
}

/// What shutdown achieved
#[derive(Debug)]
pub struct ShutdownReport {
    /// Worker finished within the grace period
    pub finished: bool,
    /// Reports not yet collected by the caller
    pub reports: Vec<ExecutionReport>,
}

/// Pending slot shared between the frame loop and the worker
struct Mailbox {
    pending: Mutex<Option<AlertEvent>>,
    notify: Notify,
    closed: AtomicBool,
}

impl Mailbox {
    fn take(&self) -> Option<AlertEvent> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

/// Runs alert side effects on a background task.
///
/// At most one execution is in flight. While it runs, a single pending
/// event waits in a capacity-1 mailbox; a newer event replaces it, so stale
/// evidence is never processed after a fresher breach.
pub struct AlertExecutor {
    mailbox: Arc<Mailbox>,
    worker: JoinHandle<()>,
    reports: mpsc::Receiver<ExecutionReport>,
}

impl AlertExecutor {
    /// Spawn the worker on `handle`
    pub fn spawn(
        handle: &Handle,
        store: Arc<dyn SnapshotStore>,
        alarm: Arc<dyn AlarmPlayer>,
    ) -> Self {
        let mailbox = Arc::new(Mailbox {
            pending: Mutex::new(None),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        });
        let (report_tx, reports) = mpsc::channel(REPORT_CAPACITY);

        let worker = handle.spawn(run_worker(mailbox.clone(), store, alarm, report_tx));
        info!("Alert executor started");

        Self {
            mailbox,
            worker,
            reports,
        }
    }

    /// Hand over an event without waiting
    pub fn dispatch(&self, event: AlertEvent) -> DispatchOutcome {
        if self.mailbox.closed.load(Ordering::Acquire) {
            warn!("Alert {} rejected: executor shutting down", event.id);
            return DispatchOutcome::Rejected;
        }

        let event_id = event.id;
        let replaced = self
            .mailbox
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(event);
        self.mailbox.notify.notify_one();

        match replaced {
            Some(stale) => {
                debug!("Alert {} superseded pending alert {}", event_id, stale.id);
                DispatchOutcome::Superseded {
                    dropped_event: stale.id,
                }
            }
            None => DispatchOutcome::Queued,
        }
    }

    /// Next finished report, if any
    pub fn try_report(&mut self) -> Option<ExecutionReport> {
        self.reports.try_recv().ok()
    }

    /// Collect all finished reports
    pub fn drain_reports(&mut self) -> Vec<ExecutionReport> {
        std::iter::from_fn(|| self.try_report()).collect()
    }

    /// Stop accepting events
    pub fn close(&self) {
        self.mailbox.closed.store(true, Ordering::Release);
        self.mailbox.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.mailbox.closed.load(Ordering::Acquire)
    }

    /// Close, then wait up to `grace` for in-flight and pending work.
    ///
    /// Work still running after the grace period is abandoned.
    pub async fn shutdown(self, grace: Duration) -> ShutdownReport {
        self.close();
        let Self {
            worker,
            mut reports,
            ..
        } = self;

        let abort = worker.abort_handle();
        let finished = match tokio::time::timeout(grace, worker).await {
            Ok(Ok(())) => {
                info!("Alert executor stopped");
                true
            }
            Ok(Err(e)) => {
                error!("Alert worker ended abnormally: {}", e);
                false
            }
            Err(_) => {
                warn!("Alert execution still running after {:?}, abandoning it", grace);
                abort.abort();
                false
            }
        };

        let mut remaining = Vec::new();
        while let Ok(report) = reports.try_recv() {
            remaining.push(report);
        }

        ShutdownReport {
            finished,
            reports: remaining,
        }
    }
}

async fn run_worker(
    mailbox: Arc<Mailbox>,
    store: Arc<dyn SnapshotStore>,
    alarm: Arc<dyn AlarmPlayer>,
    reports: mpsc::Sender<ExecutionReport>,
) {
    loop {
        match mailbox.take() {
            Some(event) => {
                let report = execute(event, store.clone(), alarm.clone()).await;
                if reports.try_send(report).is_err() {
                    debug!("Report channel full, dropping execution report");
                }
            }
            None => {
                if mailbox.closed.load(Ordering::Acquire) {
                    break;
                }
                mailbox.notify.notified().await;
            }
        }
    }
}

async fn execute(
    event: AlertEvent,
    store: Arc<dyn SnapshotStore>,
    alarm: Arc<dyn AlarmPlayer>,
) -> ExecutionReport {
    let start = Instant::now();
    let event_id = event.id;
    let name = event.snapshot_name();
    info!(
        "Executing alert {} ({}): snapshot {}",
        event_id,
        event.labels(),
        name
    );

    let frame = event.snapshot_frame;
    let snapshot_task = tokio::task::spawn_blocking(move || store.write_snapshot(&name, &frame));
    let alarm_task = tokio::task::spawn_blocking(move || alarm.play_alarm());
    let (snapshot, alarm) = tokio::join!(snapshot_task, alarm_task);

    let snapshot = snapshot.unwrap_or_else(|e| Err(AlertError::Worker(e.to_string())));
    let alarm = alarm.unwrap_or_else(|e| Err(AlertError::Worker(e.to_string())));

    ExecutionReport {
        event_id,
        snapshot,
        alarm,
        elapsed: start.elapsed(),
    }
}
