use super::types::{ComponentState, ShutdownReason};
use crate::camera::{CameraDiscovery, CameraDiscoveryBuilder, CameraSet};
use crate::capture::FrameCapture;
use crate::config::AgentConfig;
use crate::error::Result;
use crate::events::EventBus;
use crate::frame::LatestFrame;
use crate::history::HistoryStore;
use crate::inference::{ModelCatalog, ModelSource, PredictionDispatcher};
use crate::monitor::MonitorView;
use crate::process::{ProcessRunner, TokioProcessRunner};
use crate::rotation::{ModelRotator, SharedRotator};
use crate::scheduler::PollingScheduler;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Wires discovery, capture, dispatch, history and the scheduler together
/// and owns their background tasks
pub struct AgentOrchestrator {
    pub(super) config: AgentConfig,
    pub(super) event_bus: EventBus,

    // Components
    pub(super) discovery: CameraDiscovery,
    pub(super) capture: Arc<FrameCapture>,
    pub(super) dispatcher: Arc<PredictionDispatcher>,
    pub(super) catalog: Arc<ModelCatalog>,

    // Shared state
    pub(super) cameras: CameraSet,
    pub(super) rotator: SharedRotator,
    pub(super) history: Arc<HistoryStore>,
    pub(super) monitor: MonitorView,
    pub(super) model_source: Option<ModelSource>,
    pub(super) scheduler: Option<Arc<PollingScheduler>>,

    // Lifecycle management
    pub(super) tasks: Vec<(&'static str, JoinHandle<()>)>,
    pub(super) component_states: Mutex<BTreeMap<String, ComponentState>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl AgentOrchestrator {
    /// Create an orchestrator that runs real external executables
    pub fn new(config: AgentConfig) -> Result<Self> {
        Self::with_runner(config, Arc::new(TokioProcessRunner::new()))
    }

    /// Create an orchestrator with a specific process runner
    pub fn with_runner(config: AgentConfig, runner: Arc<dyn ProcessRunner>) -> Result<Self> {
        let event_bus = EventBus::new(config.system.event_bus_capacity);
        let latest_frame = LatestFrame::new();
        let cameras = CameraSet::default();
        let rotator = ModelRotator::shared(Vec::new());
        let history = Arc::new(HistoryStore::new(&config.history));

        let discovery = CameraDiscoveryBuilder::new()
            .config(config.discovery.clone())
            .runner(Arc::clone(&runner))
            .build()?;
        let capture = Arc::new(FrameCapture::new(Arc::clone(&runner), &config.capture));
        let dispatcher = Arc::new(PredictionDispatcher::new(
            &config.inference,
            latest_frame.clone(),
        )?);
        let catalog = Arc::new(ModelCatalog::new(&config.inference)?);

        let monitor = MonitorView::new(
            cameras.clone(),
            Arc::clone(&rotator),
            Arc::clone(&history),
            latest_frame,
        );
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Ok(Self {
            config,
            event_bus,
            discovery,
            capture,
            dispatcher,
            catalog,
            cameras,
            rotator,
            history,
            monitor,
            model_source: None,
            scheduler: None,
            tasks: Vec::new(),
            component_states: Mutex::new(BTreeMap::new()),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Read-only accessors for a presentation layer
    pub fn monitor(&self) -> MonitorView {
        self.monitor.clone()
    }

    pub fn event_bus(&self) -> EventBus {
        self.event_bus.clone()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Where the active model rotation came from, once initialized
    pub fn model_source(&self) -> Option<ModelSource> {
        self.model_source
    }

    pub fn scheduler(&self) -> Option<Arc<PollingScheduler>> {
        self.scheduler.clone()
    }
}
