use super::types::{
    CameraOutcome, CycleReport, CycleState, SchedulerStats, SchedulerStatsSnapshot, SkipReason,
};
use crate::camera::{CameraDescriptor, CameraSet};
use crate::capture::FrameCapture;
use crate::config::OverlapPolicy;
use crate::error::{EdgewatchError, Result};
use crate::events::{AgentEvent, EventBus};
use crate::history::{ErrorRecord, HistoryStore, PredictionRecord};
use crate::inference::PredictionDispatcher;
use crate::rotation::SharedRotator;
use chrono::Utc;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Fires capture cycles at a fixed interval.
///
/// A cycle captures and dispatches for every camera concurrently, then
/// commits the cycle's results to history as one batch and advances the
/// model rotation. Shared state is only touched in that commit step.
pub struct PollingScheduler {
    cameras: CameraSet,
    rotator: SharedRotator,
    capture: Arc<FrameCapture>,
    dispatcher: Arc<PredictionDispatcher>,
    history: Arc<HistoryStore>,
    event_bus: EventBus,
    interval: Duration,
    overlap_policy: OverlapPolicy,
    in_flight: AtomicBool,
    active_cycles: AtomicUsize,
    cycle_counter: AtomicU64,
    stats: SchedulerStats,
}

/// Decrements the active cycle count however the cycle ends
struct ActiveCycle<'a>(&'a AtomicUsize);

impl<'a> ActiveCycle<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for ActiveCycle<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Releases the single-flight flag when a guarded cycle ends
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PollingScheduler {
    pub fn builder() -> PollingSchedulerBuilder {
        PollingSchedulerBuilder::new()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn overlap_policy(&self) -> OverlapPolicy {
        self.overlap_policy
    }

    pub fn state(&self) -> CycleState {
        if self.active_cycles.load(Ordering::Acquire) > 0 {
            CycleState::CycleRunning
        } else {
            CycleState::Idle
        }
    }

    pub fn stats(&self) -> SchedulerStatsSnapshot {
        self.stats.snapshot()
    }

    /// Tick until cancelled. Cycles still in flight at cancellation are
    /// aborted, which kills their extraction processes.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        info!(
            "Polling scheduler started (interval {:?}, overlap {:?})",
            self.interval, self.overlap_policy
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = JoinSet::new();

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => self.on_tick(&mut cycles),
                Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!("Capture cycle panicked: {}", e);
                        }
                    }
                }
            }
        }

        if !cycles.is_empty() {
            info!("Aborting {} in-flight capture cycles", cycles.len());
        }
        cycles.shutdown().await;
        info!("Polling scheduler stopped");
    }

    fn on_tick(self: &Arc<Self>, cycles: &mut JoinSet<CycleReport>) {
        let guarded = self.overlap_policy == OverlapPolicy::Skip;
        if guarded && self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("Previous cycle still running, skipping tick");
            self.note_skip(SkipReason::CycleInFlight);
            return;
        }

        let scheduler = Arc::clone(self);
        cycles.spawn(async move {
            let _flight = guarded.then(|| FlightGuard(&scheduler.in_flight));
            scheduler.run_cycle().await
        });
    }

    /// Run one full cycle now
    pub async fn run_cycle(&self) -> CycleReport {
        let cycle = self.cycle_counter.fetch_add(1, Ordering::Relaxed) + 1;

        let cameras = self.cameras.snapshot();
        if cameras.is_empty() {
            return self.skip(cycle, SkipReason::NoCameras);
        }

        let current = self.rotator.lock().current().map(str::to_string);
        let model = match current {
            Ok(model) => model,
            Err(_) => return self.skip(cycle, SkipReason::NoModels),
        };

        let _active = ActiveCycle::enter(&self.active_cycles);
        let started_at = Utc::now();
        let started = Instant::now();
        debug!(cycle, model = %model, cameras = cameras.len(), "Capture cycle started");
        self.event_bus.emit(AgentEvent::CycleStarted {
            cycle,
            model: model.clone(),
            timestamp: started_at,
        });

        let outcomes = join_all(
            cameras
                .iter()
                .map(|camera| self.process_camera(camera, &model)),
        )
        .await;

        let mut report = self.commit(cycle, &model, outcomes);
        report.started_at = started_at;
        report.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            cycle,
            model = %model,
            predictions = report.predictions,
            capture_errors = report.capture_errors,
            dispatch_failures = report.dispatch_failures,
            duration_ms = report.duration_ms,
            "Capture cycle completed"
        );
        self.event_bus.emit(AgentEvent::CycleCompleted {
            cycle,
            predictions: report.predictions,
            capture_errors: report.capture_errors,
            dispatch_failures: report.dispatch_failures,
            duration_ms: report.duration_ms,
        });

        report
    }

    /// Capture then dispatch for one camera. Failures stay inside the outcome.
    async fn process_camera(&self, camera: &CameraDescriptor, model: &str) -> CameraOutcome {
        let frame = match self.capture.capture(camera).await {
            Ok(frame) => frame,
            Err(e) => return CameraOutcome::CaptureFailed(ErrorRecord::from(&e)),
        };

        match self.dispatcher.dispatch(&frame, model).await {
            Ok(record) => CameraOutcome::Predicted(record),
            Err(e) => CameraOutcome::DispatchFailed {
                camera_id: camera.id,
                error: e.to_string(),
            },
        }
    }

    fn commit(&self, cycle: u64, model: &str, outcomes: Vec<CameraOutcome>) -> CycleReport {
        let mut predictions: Vec<PredictionRecord> = Vec::new();
        let mut errors: Vec<ErrorRecord> = Vec::new();
        let mut dispatch_failures = 0;

        for outcome in outcomes {
            match outcome {
                CameraOutcome::Predicted(record) => predictions.push(record),
                CameraOutcome::CaptureFailed(record) => errors.push(record),
                CameraOutcome::DispatchFailed { camera_id, error } => {
                    dispatch_failures += 1;
                    self.event_bus
                        .emit(AgentEvent::DispatchFailed { camera_id, error });
                }
            }
        }

        for record in &predictions {
            self.event_bus.emit(AgentEvent::PredictionRecorded {
                camera_id: record.camera_id,
                model: record.model.clone(),
                timestamp: record.created_at,
            });
        }
        for record in &errors {
            self.event_bus.emit(AgentEvent::CaptureFailed {
                camera_id: record.camera_id,
                error: record.error.clone(),
            });
        }

        let prediction_count = predictions.len();
        let error_count = errors.len();
        self.history.record_predictions(predictions);
        self.history.record_errors(errors);
        self.rotator.lock().advance();

        self.stats.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.stats
            .predictions
            .fetch_add(prediction_count as u64, Ordering::Relaxed);
        self.stats
            .capture_errors
            .fetch_add(error_count as u64, Ordering::Relaxed);
        self.stats
            .dispatch_failures
            .fetch_add(dispatch_failures as u64, Ordering::Relaxed);

        CycleReport {
            cycle,
            model: Some(model.to_string()),
            started_at: Utc::now(),
            duration_ms: 0,
            predictions: prediction_count,
            capture_errors: error_count,
            dispatch_failures,
            skipped: None,
        }
    }

    fn skip(&self, cycle: u64, reason: SkipReason) -> CycleReport {
        debug!(cycle, "Skipping capture cycle: {}", reason);
        self.note_skip(reason);
        CycleReport::skipped(cycle, reason)
    }

    fn note_skip(&self, reason: SkipReason) {
        self.stats.cycles_skipped.fetch_add(1, Ordering::Relaxed);
        self.event_bus.emit(AgentEvent::CycleSkipped {
            reason: reason.to_string(),
        });
    }
}

/// Builder for `PollingScheduler`
pub struct PollingSchedulerBuilder {
    cameras: Option<CameraSet>,
    rotator: Option<SharedRotator>,
    capture: Option<Arc<FrameCapture>>,
    dispatcher: Option<Arc<PredictionDispatcher>>,
    history: Option<Arc<HistoryStore>>,
    event_bus: Option<EventBus>,
    interval: Duration,
    overlap_policy: OverlapPolicy,
}

impl PollingSchedulerBuilder {
    pub fn new() -> Self {
        Self {
            cameras: None,
            rotator: None,
            capture: None,
            dispatcher: None,
            history: None,
            event_bus: None,
            interval: Duration::from_millis(2000),
            overlap_policy: OverlapPolicy::Skip,
        }
    }

    pub fn cameras(mut self, cameras: CameraSet) -> Self {
        self.cameras = Some(cameras);
        self
    }

    pub fn rotator(mut self, rotator: SharedRotator) -> Self {
        self.rotator = Some(rotator);
        self
    }

    pub fn capture(mut self, capture: Arc<FrameCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<PredictionDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn history(mut self, history: Arc<HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap_policy = policy;
        self
    }

    pub fn build(self) -> Result<PollingScheduler> {
        if self.interval.is_zero() {
            warn!("Scheduler interval of zero requested");
            return Err(EdgewatchError::system("Scheduler interval must be greater than 0"));
        }

        Ok(PollingScheduler {
            cameras: self.cameras.unwrap_or_default(),
            rotator: self
                .rotator
                .ok_or_else(|| EdgewatchError::system("Model rotator must be specified"))?,
            capture: self
                .capture
                .ok_or_else(|| EdgewatchError::system("Frame capture must be specified"))?,
            dispatcher: self
                .dispatcher
                .ok_or_else(|| EdgewatchError::system("Prediction dispatcher must be specified"))?,
            history: self
                .history
                .ok_or_else(|| EdgewatchError::system("History store must be specified"))?,
            event_bus: self.event_bus.unwrap_or_else(|| EventBus::new(100)),
            interval: self.interval,
            overlap_policy: self.overlap_policy,
            in_flight: AtomicBool::new(false),
            active_cycles: AtomicUsize::new(0),
            cycle_counter: AtomicU64::new(0),
            stats: SchedulerStats::default(),
        })
    }
}

impl Default for PollingSchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
