use super::stats::{CaptureStats, CaptureStatsSnapshot};
use crate::camera::CameraDescriptor;
use crate::config::CaptureConfig;
use crate::error::{CaptureError, ProcessError};
use crate::frame::CapturedFrame;
use crate::process::{CommandSpec, ProcessRunner};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Grabs single still frames from camera streams with an external extractor (ffmpeg)
pub struct FrameCapture {
    runner: Arc<dyn ProcessRunner>,
    program: String,
    timeout: Duration,
    jpeg_quality: u32,
    stats: CaptureStats,
}

impl FrameCapture {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: &CaptureConfig) -> Self {
        Self {
            runner,
            program: config.ffmpeg_path.clone(),
            timeout: config.timeout(),
            jpeg_quality: config.jpeg_quality,
            stats: CaptureStats::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn stats(&self) -> CaptureStatsSnapshot {
        self.stats.snapshot()
    }

    /// Extraction command: read the live stream, write exactly one JPEG to stdout
    fn command_for(&self, camera: &CameraDescriptor) -> CommandSpec {
        CommandSpec::new(&self.program, self.timeout).args([
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            camera.stream_url.clone(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            self.jpeg_quality.to_string(),
            "-f".to_string(),
            "image2pipe".to_string(),
            "-vcodec".to_string(),
            "mjpeg".to_string(),
            "pipe:1".to_string(),
        ])
    }

    /// Capture one frame. Succeeds only on a clean exit with a non-empty image.
    pub async fn capture(&self, camera: &CameraDescriptor) -> Result<CapturedFrame, CaptureError> {
        self.stats.attempts.fetch_add(1, Ordering::Relaxed);
        let command = self.command_for(camera);

        let output = match self.runner.run(&command).await {
            Ok(output) => output,
            Err(ProcessError::Timeout { after, .. }) => {
                self.stats.timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    camera_id = camera.id,
                    stream = %camera.stream_url,
                    "Frame capture timed out after {:?}",
                    after
                );
                return Err(CaptureError::Timeout {
                    camera_id: camera.id,
                    after,
                });
            }
            Err(e) => return Err(self.failed(camera, e.to_string())),
        };

        if !output.success {
            let stderr = output.stderr_text();
            let details = match stderr.trim() {
                "" => format!("{} exited with {:?}", self.program, output.code),
                msg => format!("{} exited with {:?}: {}", self.program, output.code, msg),
            };
            return Err(self.failed(camera, details));
        }

        if output.stdout.is_empty() {
            return Err(self.failed(camera, format!("{} produced no image data", self.program)));
        }

        self.stats.frames.fetch_add(1, Ordering::Relaxed);
        self.stats
            .bytes
            .fetch_add(output.stdout.len() as u64, Ordering::Relaxed);

        let frame = CapturedFrame::new(camera.id, output.stdout);
        debug!(camera_id = camera.id, size = frame.len(), "Captured frame");
        Ok(frame)
    }

    fn failed(&self, camera: &CameraDescriptor, details: String) -> CaptureError {
        self.stats.failures.fetch_add(1, Ordering::Relaxed);
        warn!(camera_id = camera.id, "Frame capture failed: {}", details);
        CaptureError::Failed {
            camera_id: camera.id,
            details,
        }
    }
}
