use super::descriptor::DeviceEntry;
use super::parse::{parse_dshow_devices, parse_v4l2_devices};
use crate::config::{DiscoveryConfig, ProbeKind};
use crate::error::DiscoveryError;
use crate::process::{CommandSpec, ProcessRunner};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Platform-specific camera enumeration
#[async_trait]
pub trait CameraProbe: Send + Sync {
    fn name(&self) -> &'static str;

    /// Capture devices in enumeration order
    async fn probe(&self) -> Result<Vec<DeviceEntry>, DiscoveryError>;
}

/// Enumerates V4L2 devices through `v4l2-ctl --list-devices`
pub struct LinuxProbe {
    runner: Arc<dyn ProcessRunner>,
    program: String,
    ignore_patterns: Vec<String>,
    timeout: Duration,
}

impl LinuxProbe {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: &DiscoveryConfig) -> Self {
        Self {
            runner,
            program: config.v4l2_ctl_path.clone(),
            ignore_patterns: config.ignore_patterns.clone(),
            timeout: Duration::from_secs(config.probe_timeout_secs),
        }
    }
}

#[async_trait]
impl CameraProbe for LinuxProbe {
    fn name(&self) -> &'static str {
        "linux"
    }

    async fn probe(&self) -> Result<Vec<DeviceEntry>, DiscoveryError> {
        let command = CommandSpec::new(&self.program, self.timeout).arg("--list-devices");
        let output = self.runner.run(&command).await.map_err(|e| unavailable(self.name(), e))?;

        // v4l2-ctl exits non-zero when one node fails to open but still lists the rest
        if !output.success && output.stdout.is_empty() {
            return Err(DiscoveryError::Unavailable {
                probe: self.name().to_string(),
                details: format!(
                    "{} exited with {:?}: {}",
                    self.program,
                    output.code,
                    output.stderr_text().trim()
                ),
            });
        }

        let entries = parse_v4l2_devices(&output.stdout_text(), &self.ignore_patterns);
        debug!("v4l2-ctl reported {} capture devices", entries.len());
        Ok(entries)
    }
}

/// Enumerates DirectShow video devices through ffmpeg
pub struct WindowsProbe {
    runner: Arc<dyn ProcessRunner>,
    program: String,
    timeout: Duration,
}

impl WindowsProbe {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: &DiscoveryConfig) -> Self {
        Self {
            runner,
            program: config.ffmpeg_path.clone(),
            timeout: Duration::from_secs(config.probe_timeout_secs),
        }
    }
}

#[async_trait]
impl CameraProbe for WindowsProbe {
    fn name(&self) -> &'static str {
        "windows"
    }

    async fn probe(&self) -> Result<Vec<DeviceEntry>, DiscoveryError> {
        let command = CommandSpec::new(&self.program, self.timeout).args([
            "-hide_banner",
            "-list_devices",
            "true",
            "-f",
            "dshow",
            "-i",
            "dummy",
        ]);

        // ffmpeg always fails this invocation (no real input); the listing is on stderr
        let output = self.runner.run(&command).await.map_err(|e| unavailable(self.name(), e))?;
        let entries = parse_dshow_devices(&output.stderr_text());
        debug!("DirectShow reported {} video devices", entries.len());
        Ok(entries)
    }
}

/// Used where no enumeration utility exists
pub struct NullProbe;

#[async_trait]
impl CameraProbe for NullProbe {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn probe(&self) -> Result<Vec<DeviceEntry>, DiscoveryError> {
        Ok(Vec::new())
    }
}

fn unavailable(probe: &str, error: impl std::fmt::Display) -> DiscoveryError {
    DiscoveryError::Unavailable {
        probe: probe.to_string(),
        details: error.to_string(),
    }
}

/// Pick the probe for the configured (or running) platform
pub fn select_probe(config: &DiscoveryConfig, runner: Arc<dyn ProcessRunner>) -> Box<dyn CameraProbe> {
    let kind = match config.probe {
        ProbeKind::Auto if cfg!(target_os = "linux") => ProbeKind::Linux,
        ProbeKind::Auto if cfg!(target_os = "windows") => ProbeKind::Windows,
        ProbeKind::Auto => ProbeKind::None,
        explicit => explicit,
    };

    match kind {
        ProbeKind::Linux => Box::new(LinuxProbe::new(runner, config)),
        ProbeKind::Windows => Box::new(WindowsProbe::new(runner, config)),
        _ => Box::new(NullProbe),
    }
}
