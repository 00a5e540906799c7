use crate::camera::{CameraDescriptor, CameraSet};
use crate::frame::{FrameSnapshot, LatestFrame};
use crate::history::{ErrorRecord, HistoryStore, PredictionRecord};
use crate::rotation::SharedRotator;
use crate::scheduler::{CycleState, PollingScheduler};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Aggregate agent status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentStatus {
    pub camera_count: usize,
    pub current_model: Option<String>,
    pub total_predictions: usize,
    pub total_errors: usize,
    pub cycle_state: CycleState,
}

/// Read-only view over the agent's live state, for a presentation layer.
/// Every accessor returns an owned snapshot.
#[derive(Clone)]
pub struct MonitorView {
    cameras: CameraSet,
    rotator: SharedRotator,
    history: Arc<HistoryStore>,
    latest_frame: LatestFrame,
    scheduler: Arc<RwLock<Option<Arc<PollingScheduler>>>>,
}

impl MonitorView {
    pub fn new(
        cameras: CameraSet,
        rotator: SharedRotator,
        history: Arc<HistoryStore>,
        latest_frame: LatestFrame,
    ) -> Self {
        Self {
            cameras,
            rotator,
            history,
            latest_frame,
            scheduler: Arc::new(RwLock::new(None)),
        }
    }

    /// Attach the running scheduler so `status()` can report its cycle state
    pub fn attach_scheduler(&self, scheduler: Arc<PollingScheduler>) {
        *self.scheduler.write() = Some(scheduler);
    }

    pub fn cameras(&self) -> Vec<CameraDescriptor> {
        self.cameras.snapshot()
    }

    pub fn predictions(&self) -> Vec<PredictionRecord> {
        self.history.predictions()
    }

    pub fn latest_per_camera(&self) -> BTreeMap<u32, PredictionRecord> {
        self.history.latest_per_camera()
    }

    pub fn predictions_for_camera(&self, camera_id: u32) -> Vec<PredictionRecord> {
        self.history.by_camera(camera_id)
    }

    pub fn models(&self) -> Vec<String> {
        self.rotator.lock().models().to_vec()
    }

    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.history.errors()
    }

    pub fn latest_frame(&self) -> Option<FrameSnapshot> {
        self.latest_frame.get()
    }

    pub fn status(&self) -> AgentStatus {
        let current_model = self.rotator.lock().current().ok().map(str::to_string);
        let cycle_state = self
            .scheduler
            .read()
            .as_ref()
            .map(|s| s.state())
            .unwrap_or(CycleState::Idle);

        AgentStatus {
            camera_count: self.cameras.len(),
            current_model,
            total_predictions: self.history.prediction_count(),
            total_errors: self.history.error_count(),
            cycle_state,
        }
    }
}
