use crate::history::{ErrorRecord, PredictionRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Whether any capture cycle is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    CycleRunning,
}

/// Why a tick did no work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoCameras,
    NoModels,
    /// The previous cycle had not finished and overlap is disabled
    CycleInFlight,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoCameras => write!(f, "no cameras"),
            SkipReason::NoModels => write!(f, "no models"),
            SkipReason::CycleInFlight => write!(f, "previous cycle still running"),
        }
    }
}

/// Result of one camera's capture and dispatch within a cycle
#[derive(Debug)]
pub enum CameraOutcome {
    Predicted(PredictionRecord),
    CaptureFailed(ErrorRecord),
    DispatchFailed { camera_id: u32, error: String },
}

/// Summary of one scheduler tick
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub model: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub predictions: usize,
    pub capture_errors: usize,
    pub dispatch_failures: usize,
    pub skipped: Option<SkipReason>,
}

impl CycleReport {
    pub(super) fn skipped(cycle: u64, reason: SkipReason) -> Self {
        Self {
            cycle,
            model: None,
            started_at: Utc::now(),
            duration_ms: 0,
            predictions: 0,
            capture_errors: 0,
            dispatch_failures: 0,
            skipped: Some(reason),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }
}

#[derive(Debug, Default)]
pub struct SchedulerStats {
    pub cycles_completed: AtomicU64,
    pub cycles_skipped: AtomicU64,
    pub predictions: AtomicU64,
    pub capture_errors: AtomicU64,
    pub dispatch_failures: AtomicU64,
}

impl SchedulerStats {
    pub fn snapshot(&self) -> SchedulerStatsSnapshot {
        SchedulerStatsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            predictions: self.predictions.load(Ordering::Relaxed),
            capture_errors: self.capture_errors.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerStatsSnapshot {
    pub cycles_completed: u64,
    pub cycles_skipped: u64,
    pub predictions: u64,
    pub capture_errors: u64,
    pub dispatch_failures: u64,
}
