use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EdgewatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Rotation error: {0}")]
    Rotation(#[from] RotationError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl EdgewatchError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Camera enumeration failures. Never surfaced past `CameraDiscovery`.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Camera probe '{probe}' unavailable: {details}")]
    Unavailable { probe: String, details: String },
}

/// Failures running an external executable
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Executable not found: {program}")]
    NotFound { program: String },

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {after:?}")]
    Timeout { program: String, after: Duration },

    #[error("Process IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No frame from camera {camera_id} within {after:?}")]
    Timeout { camera_id: u32, after: Duration },

    #[error("Frame capture failed for camera {camera_id}: {details}")]
    Failed { camera_id: u32, details: String },
}

impl CaptureError {
    pub fn camera_id(&self) -> u32 {
        match self {
            CaptureError::Timeout { camera_id, .. } => *camera_id,
            CaptureError::Failed { camera_id, .. } => *camera_id,
        }
    }
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Inference request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Inference service returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Inference service reported an error: {message}")]
    ServiceError { message: String },

    #[error("Invalid inference response: {details}")]
    InvalidResponse { details: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RotationError {
    #[error("Model rotation is empty")]
    EmptyRotation,
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, EdgewatchError>;
