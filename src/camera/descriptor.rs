use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A camera found at startup, with the local stream it is served on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDescriptor {
    /// Sequential id in discovery order, starting at 0
    pub id: u32,
    /// Human-readable device name, when the probe reports one
    pub name: Option<String>,
    /// Device node (`/dev/video0`) or platform handle (`video=HD Webcam`)
    pub device: String,
    pub port: u16,
    pub stream_url: String,
}

impl CameraDescriptor {
    pub fn new(id: u32, name: Option<String>, device: String, base_port: u16) -> Self {
        let port = stream_port(base_port, id);
        Self {
            id,
            name,
            device,
            port,
            stream_url: stream_url(port),
        }
    }

    /// Name for log lines: the device name when known, the device path otherwise
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.device)
    }
}

/// Port of camera `id`, saturating at the top of the port range
pub fn stream_port(base_port: u16, id: u32) -> u16 {
    u16::try_from(base_port as u32 + id).unwrap_or(u16::MAX)
}

pub fn stream_url(port: u16) -> String {
    format!("http://localhost:{}/stream", port)
}

/// A capture device as reported by a probe, before ids are assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub name: Option<String>,
    pub device: String,
}

/// The discovered camera list, shared between the scheduler and accessors
#[derive(Debug, Clone, Default)]
pub struct CameraSet {
    cameras: Arc<RwLock<Vec<CameraDescriptor>>>,
}

impl CameraSet {
    pub fn new(cameras: Vec<CameraDescriptor>) -> Self {
        Self {
            cameras: Arc::new(RwLock::new(cameras)),
        }
    }

    pub fn replace(&self, cameras: Vec<CameraDescriptor>) {
        *self.cameras.write() = cameras;
    }

    pub fn snapshot(&self) -> Vec<CameraDescriptor> {
        self.cameras.read().clone()
    }

    pub fn get(&self, id: u32) -> Option<CameraDescriptor> {
        self.cameras.read().iter().find(|c| c.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.cameras.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.read().is_empty()
    }
}
