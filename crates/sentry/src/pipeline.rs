//! Frame loop orchestration

use alerting::{
    AlarmPlayer, AlertEvent, AlertExecutor, AlertPhase, AlertState, AlertStateMachine,
    DispatchOutcome, ExecutionReport, FsSnapshotStore, SilentAlarm, SnapshotStore, SystemAlarm,
};
use camera_capture::{FrameSource, ImageSequenceSource, SyntheticSource, VideoFrame};
use detection::{DetectionFilter, Detector, FrameDecision, FrameScheduler, ScriptedDetector};
use geofence::{breach_count, GeofenceEngine};
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::config::{SentryConfig, SentrySettings};
use crate::render::{CycleView, FrameRenderer, LogRenderer};
use crate::PipelineError;

/// External collaborators of the frame loop
pub struct Collaborators {
    pub source: Box<dyn FrameSource>,
    pub detector: Box<dyn Detector>,
    pub renderer: Box<dyn FrameRenderer>,
    pub store: Arc<dyn SnapshotStore>,
    pub alarm: Arc<dyn AlarmPlayer>,
}

impl Collaborators {
    /// Build the stock collaborators described by `config`
    pub fn from_config(config: &SentryConfig) -> Result<Self, PipelineError> {
        let source: Box<dyn FrameSource> = match &config.source_dir {
            Some(dir) => Box::new(ImageSequenceSource::open(dir)?),
            None => Box::new(SyntheticSource::new(&config.camera, None)),
        };
        let detector = match &config.detector_script {
            Some(path) => ScriptedDetector::from_path(path)?,
            None => {
                warn!("No detector script configured, nothing will be detected");
                ScriptedDetector::empty()
            }
        };
        let alarm: Arc<dyn AlarmPlayer> = if config.alarm.enabled {
            Arc::new(SystemAlarm::new(config.alarm.command.clone()))
        } else {
            Arc::new(SilentAlarm)
        };

        Ok(Self {
            source,
            detector: Box::new(detector),
            renderer: Box::new(LogRenderer::new()),
            store: Arc::new(FsSnapshotStore::new(&config.evidence_dir)?),
            alarm,
        })
    }
}

/// Counters kept across the run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    pub frames: u64,
    pub inferences: u64,
    pub detector_errors: u64,
    pub source_errors: u64,
    /// Alert events fired by the state machine
    pub alerts: u64,
    /// Pending alerts replaced before they started
    pub superseded: u64,
    pub rejected: u64,
    /// Executions that reported back
    pub executions: u64,
    pub execution_failures: u64,
    /// Cycles that overran the frame budget
    pub deadline_misses: u64,
    pub worst_cycle: Duration,
    /// Alert work finished within the shutdown grace period
    pub clean_shutdown: bool,
}

impl PipelineStats {
    fn record_execution(&mut self, report: &ExecutionReport) {
        self.executions += 1;
        if let Err(e) = &report.snapshot {
            error!("Alert {}: {}", report.event_id, e);
        }
        if let Err(e) = &report.alarm {
            error!("Alert {}: {}", report.event_id, e);
        }

        if report.is_success() {
            debug!("Alert {} carried out in {:?}", report.event_id, report.elapsed);
        } else {
            self.execution_failures += 1;
            counter!("sentry_alert_failures_total").increment(1);
        }
    }
}

/// Result of one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    pub decision: FrameDecision,
    /// Detections in effect this cycle
    pub detections: usize,
    /// Of those, how many are inside a zone
    pub breaching: usize,
    pub phase: AlertPhase,
    pub event_id: Option<u64>,
    pub dispatch: Option<DispatchOutcome>,
}

/// The frame loop.
///
/// Single-threaded: capture, inference, filtering, zone checks and the alert
/// decision all run on the caller's thread. Only alert side effects leave it,
/// through the [`AlertExecutor`].
pub struct Pipeline {
    source: Box<dyn FrameSource>,
    detector: Box<dyn Detector>,
    renderer: Box<dyn FrameRenderer>,
    scheduler: FrameScheduler,
    filter: DetectionFilter,
    geofence: GeofenceEngine,
    alerts: AlertStateMachine,
    executor: AlertExecutor,
    frame_budget: Option<Duration>,
    max_frames: Option<u64>,
    max_failures: u32,
    source_failures: u32,
    grace_period: Duration,
    stop: Arc<AtomicBool>,
    stats: PipelineStats,
}

impl Pipeline {
    /// Assemble the loop; the alert worker is spawned on `handle`
    pub fn new(settings: SentrySettings, parts: Collaborators, handle: &Handle) -> Self {
        let executor = AlertExecutor::spawn(handle, parts.store, parts.alarm);

        Self {
            source: parts.source,
            detector: parts.detector,
            renderer: parts.renderer,
            scheduler: settings.scheduler,
            filter: settings.filter,
            geofence: settings.geofence,
            alerts: AlertStateMachine::new(settings.cooldown),
            executor,
            frame_budget: settings.frame_budget,
            max_frames: settings.max_frames,
            max_failures: settings.max_failures,
            source_failures: 0,
            grace_period: settings.grace_period,
            stop: Arc::new(AtomicBool::new(false)),
            stats: PipelineStats::default(),
        }
    }

    /// Flag that ends [`Pipeline::run`] at the next cycle boundary
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn alert_state(&self) -> &AlertState {
        self.alerts.state()
    }

    /// Process one frame captured at `now`
    pub fn step(&mut self, frame: VideoFrame, now: Instant) -> CycleOutcome {
        self.stats.frames += 1;
        counter!("sentry_frames_total").increment(1);

        let decision = self.scheduler.next_frame();
        if decision == FrameDecision::Infer {
            self.infer(&frame);
        }

        let verdicts = self.geofence.evaluate(self.scheduler.last_result().to_vec());
        let breaching = breach_count(&verdicts);

        let event = self.alerts.update(&verdicts, &frame, now);
        let event_id = event.as_ref().map(|e| e.id);
        let dispatch = event.map(|event| self.dispatch(event));

        self.collect_reports();
        self.renderer.render(&CycleView {
            frame: &frame,
            decision,
            verdicts: &verdicts,
            alert: self.alerts.state(),
            event_id,
        });

        CycleOutcome {
            decision,
            detections: verdicts.len(),
            breaching,
            phase: self.alerts.phase(),
            event_id,
            dispatch,
        }
    }

    fn infer(&mut self, frame: &VideoFrame) {
        self.stats.inferences += 1;
        counter!("sentry_inferences_total").increment(1);

        match self.detector.detect(frame) {
            Ok(raw) => {
                let kept = self.filter.filter(&raw);
                debug!(
                    "Frame {}: {} detections, {} kept",
                    frame.sequence,
                    raw.len(),
                    kept.len()
                );
                self.scheduler.update(kept);
            }
            Err(e) => {
                self.stats.detector_errors += 1;
                counter!("sentry_detector_errors_total").increment(1);
                warn!(
                    "Detector '{}' failed on frame {}: {}",
                    self.detector.name(),
                    frame.sequence,
                    e
                );
                self.scheduler.record_failure();
            }
        }
    }

    fn dispatch(&mut self, event: AlertEvent) -> DispatchOutcome {
        warn!("THREAT DETECTED: {}", event.labels());
        self.stats.alerts += 1;
        counter!("sentry_alerts_total").increment(1);

        let outcome = self.executor.dispatch(event);
        match outcome {
            DispatchOutcome::Queued => {}
            DispatchOutcome::Superseded { .. } => self.stats.superseded += 1,
            DispatchOutcome::Rejected => self.stats.rejected += 1,
        }
        outcome
    }

    fn collect_reports(&mut self) {
        for report in self.executor.drain_reports() {
            self.stats.record_execution(&report);
        }
    }

    fn record_cycle(&mut self, elapsed: Duration) {
        histogram!("sentry_cycle_seconds").record(elapsed.as_secs_f64());
        if elapsed > self.stats.worst_cycle {
            self.stats.worst_cycle = elapsed;
        }
        if let Some(budget) = self.frame_budget {
            if elapsed > budget {
                self.stats.deadline_misses += 1;
                debug!("Cycle took {:?}, budget {:?}", elapsed, budget);
            }
        }
    }

    /// Run until the source ends, the stop flag is raised or the frame
    /// limit is reached
    pub fn run(&mut self) -> Result<PipelineStats, PipelineError> {
        info!(
            "Sentry v{} ARMED: source '{}', detector '{}', {} zone(s)",
            env!("CARGO_PKG_VERSION"),
            self.source.name(),
            self.detector.name(),
            self.geofence.zones().len()
        );

        loop {
            if self.stop.load(Ordering::Acquire) {
                info!("Stop requested");
                break;
            }
            if self.max_frames.map_or(false, |max| self.stats.frames >= max) {
                info!("Frame limit reached");
                break;
            }

            let started = Instant::now();
            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => {
                    self.source_failures = 0;
                    frame
                }
                Ok(None) => {
                    info!("Source '{}' ended", self.source.name());
                    break;
                }
                Err(e) => {
                    self.source_failures += 1;
                    self.stats.source_errors += 1;
                    if self.source_failures > self.max_failures {
                        error!(
                            "Giving up after {} consecutive frame failures",
                            self.source_failures
                        );
                        return Err(PipelineError::Source(e));
                    }
                    warn!("Frame read failed, skipping cycle: {}", e);
                    continue;
                }
            };

            self.step(frame, started);

            let elapsed = started.elapsed();
            self.record_cycle(elapsed);
            if let Some(rest) = self.frame_budget.and_then(|b| b.checked_sub(elapsed)) {
                std::thread::sleep(rest);
            }
        }

        Ok(self.stats.clone())
    }

    /// Stop the alert worker, giving in-flight work the grace period
    pub async fn shutdown(mut self) -> PipelineStats {
        self.collect_reports();

        let Pipeline {
            executor,
            mut stats,
            grace_period,
            ..
        } = self;

        let report = executor.shutdown(grace_period).await;
        for execution in &report.reports {
            stats.record_execution(execution);
        }
        stats.clean_shutdown = report.finished;

        info!(
            "Shutdown: {} frames, {} inferences, {} alerts ({} carried out, {} failed)",
            stats.frames, stats.inferences, stats.alerts, stats.executions, stats.execution_failures
        );
        stats
    }
}
