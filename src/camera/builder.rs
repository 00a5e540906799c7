use super::discovery::CameraDiscovery;
use super::probe::select_probe;
use crate::config::DiscoveryConfig;
use crate::error::{EdgewatchError, Result};
use crate::process::ProcessRunner;
use std::sync::Arc;

/// Builder wiring a platform probe and process runner into a `CameraDiscovery`
pub struct CameraDiscoveryBuilder {
    config: Option<DiscoveryConfig>,
    runner: Option<Arc<dyn ProcessRunner>>,
}

impl CameraDiscoveryBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            runner: None,
        }
    }

    pub fn config(mut self, config: DiscoveryConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn build(self) -> Result<CameraDiscovery> {
        let config = self
            .config
            .ok_or_else(|| EdgewatchError::system("Discovery configuration must be specified"))?;
        let runner = self
            .runner
            .ok_or_else(|| EdgewatchError::system("Process runner must be specified"))?;

        Ok(CameraDiscovery::new(
            select_probe(&config, runner),
            config.base_port,
        ))
    }
}

impl Default for CameraDiscoveryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
