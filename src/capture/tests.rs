use super::*;
use crate::camera::CameraDescriptor;
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::process::{MockProcessRunner, MockResponse, ProcessRunner, TokioProcessRunner};
use std::sync::Arc;
use std::time::Duration;

const JPEG: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xD9];

fn camera(id: u32) -> CameraDescriptor {
    CameraDescriptor::new(id, Some(format!("cam{}", id)), format!("/dev/video{}", id), 8090)
}

fn capture_with(runner: Arc<dyn ProcessRunner>, config: &CaptureConfig) -> FrameCapture {
    FrameCapture::new(runner, config)
}

#[tokio::test]
async fn test_capture_returns_frame_bytes() {
    let runner = Arc::new(MockProcessRunner::new().on("ffmpeg", MockResponse::stdout(JPEG.to_vec())));
    let capture = capture_with(runner.clone(), &CaptureConfig::default());

    let frame = capture.capture(&camera(1)).await.unwrap();
    assert_eq!(frame.camera_id, 1);
    assert_eq!(frame.data.as_ref(), &JPEG);

    let invocation = &runner.invocations()[0];
    assert!(invocation.args.contains(&"http://localhost:8091/stream".to_string()));
    assert!(invocation.args.windows(2).any(|w| w[0] == "-frames:v" && w[1] == "1"));
    assert_eq!(invocation.timeout, Duration::from_secs(10));

    let stats = capture.stats();
    assert_eq!(stats.frames, 1);
    assert_eq!(stats.bytes, 4);
}

#[tokio::test]
async fn test_capture_nonzero_exit_fails() {
    let runner = Arc::new(
        MockProcessRunner::new().on("ffmpeg", MockResponse::exit(1, "Connection refused")),
    );
    let capture = capture_with(runner, &CaptureConfig::default());

    match capture.capture(&camera(0)).await {
        Err(CaptureError::Failed { camera_id, details }) => {
            assert_eq!(camera_id, 0);
            assert!(details.contains("Connection refused"));
        }
        other => panic!("Expected CaptureFailed, got {:?}", other),
    }
    assert_eq!(capture.stats().failures, 1);
}

#[tokio::test]
async fn test_capture_empty_output_fails() {
    let runner = Arc::new(MockProcessRunner::new().on("ffmpeg", MockResponse::stdout(Vec::new())));
    let capture = capture_with(runner, &CaptureConfig::default());

    assert!(matches!(
        capture.capture(&camera(0)).await,
        Err(CaptureError::Failed { .. })
    ));
}

#[tokio::test]
async fn test_capture_missing_extractor_fails() {
    let capture = capture_with(Arc::new(MockProcessRunner::new()), &CaptureConfig::default());

    assert!(matches!(
        capture.capture(&camera(0)).await,
        Err(CaptureError::Failed { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_capture_timeout_honors_deadline() {
    let runner = Arc::new(MockProcessRunner::new().on("ffmpeg", MockResponse::Hang));
    let capture = capture_with(runner, &CaptureConfig::default());
    let started = tokio::time::Instant::now();

    let result = capture.capture(&camera(0)).await;
    let elapsed = started.elapsed();

    assert!(matches!(
        result,
        Err(CaptureError::Timeout { camera_id: 0, after }) if after == Duration::from_secs(10)
    ));
    assert!(elapsed >= Duration::from_secs(10));
    assert!(elapsed < Duration::from_secs(11));
    assert_eq!(capture.stats().timeouts, 1);
}

#[cfg(unix)]
fn write_script(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

#[cfg(unix)]
#[tokio::test]
async fn test_capture_with_real_process() {
    let dir = tempfile::tempdir().unwrap();
    let config = CaptureConfig {
        ffmpeg_path: write_script(&dir, "fake-ffmpeg", r"printf '\377\330\377\331'"),
        ..CaptureConfig::default()
    };
    let capture = capture_with(Arc::new(TokioProcessRunner::new()), &config);

    let frame = capture.capture(&camera(0)).await.unwrap();
    assert!(frame.looks_like_jpeg());
    assert_eq!(frame.len(), 4);
}

#[cfg(unix)]
#[tokio::test]
async fn test_capture_kills_stalled_process() {
    let dir = tempfile::tempdir().unwrap();
    let config = CaptureConfig {
        ffmpeg_path: write_script(&dir, "stalled-ffmpeg", "exec sleep 30"),
        timeout_secs: 1,
        ..CaptureConfig::default()
    };
    let capture = capture_with(Arc::new(TokioProcessRunner::new()), &config);
    let started = std::time::Instant::now();

    let result = capture.capture(&camera(0)).await;
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(CaptureError::Timeout { .. })));
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(3));
}

#[cfg(unix)]
#[tokio::test]
async fn test_capture_deadline_covers_forked_helper_holding_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = CaptureConfig {
        ffmpeg_path: write_script(&dir, "forking-ffmpeg", "sleep 6 &\nexit 0"),
        timeout_secs: 1,
        ..CaptureConfig::default()
    };
    let capture = capture_with(Arc::new(TokioProcessRunner::new()), &config);
    let started = std::time::Instant::now();

    let result = capture.capture(&camera(0)).await;
    let elapsed = started.elapsed();

    assert!(
        matches!(result, Err(CaptureError::Timeout { camera_id: 0, .. })),
        "{:?}",
        result
    );
    assert!(elapsed < Duration::from_secs(3), "capture took {:?}", elapsed);
    assert_eq!(capture.stats().timeouts, 1);
}
