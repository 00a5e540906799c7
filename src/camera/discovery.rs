use super::descriptor::CameraDescriptor;
use super::probe::CameraProbe;
use tracing::{info, warn};

/// Turns probe output into camera descriptors with stable ids and stream endpoints
pub struct CameraDiscovery {
    probe: Box<dyn CameraProbe>,
    base_port: u16,
}

impl CameraDiscovery {
    pub fn new(probe: Box<dyn CameraProbe>, base_port: u16) -> Self {
        Self { probe, base_port }
    }

    pub fn probe_name(&self) -> &'static str {
        self.probe.name()
    }

    /// Enumerate cameras. Never fails: an unusable probe yields an empty list.
    pub async fn discover(&self) -> Vec<CameraDescriptor> {
        let entries = match self.probe.probe().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Camera discovery unavailable: {}", e);
                return Vec::new();
            }
        };

        let cameras: Vec<CameraDescriptor> = entries
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| {
                CameraDescriptor::new(idx as u32, entry.name, entry.device, self.base_port)
            })
            .collect();

        for camera in &cameras {
            info!(
                camera_id = camera.id,
                device = %camera.device,
                stream = %camera.stream_url,
                "Discovered camera '{}'",
                camera.label()
            );
        }

        if cameras.is_empty() {
            warn!("No cameras found by '{}' probe", self.probe.name());
        }

        cameras
    }
}
