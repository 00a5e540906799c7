pub mod app;
pub mod camera;
pub mod capture;
pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod history;
pub mod inference;
pub mod monitor;
pub mod process;
pub mod rotation;
pub mod scheduler;

#[cfg(test)]
mod test_support;

pub use app::{AgentOrchestrator, ComponentState, ShutdownReason};
pub use camera::{CameraDescriptor, CameraDiscovery, CameraDiscoveryBuilder, CameraProbe, CameraSet};
pub use capture::{CaptureStats, FrameCapture};
pub use config::{AgentConfig, OverlapPolicy, ProbeKind};
pub use error::{EdgewatchError, Result};
pub use events::{AgentEvent, EventBus, EventFilter, EventReceiver};
pub use frame::{CapturedFrame, EncodedFrame, FrameSnapshot, LatestFrame};
pub use history::{BoundedHistory, ErrorRecord, HistoryStore, PredictionRecord};
pub use inference::{ModelCatalog, PredictionDispatcher, PredictionSummary};
pub use monitor::{AgentStatus, MonitorView};
pub use process::{CommandSpec, MockProcessRunner, ProcessRunner, TokioProcessRunner};
pub use rotation::ModelRotator;
pub use scheduler::{CycleReport, CycleState, PollingScheduler};
