use super::*;
use crate::config::{AgentConfig, ProbeKind};
use crate::events::AgentEvent;
use crate::inference::{ModelCatalog, ModelSource};
use crate::process::{MockProcessRunner, MockResponse};
use crate::rotation::ModelRotator;
use crate::scheduler::CycleState;
use crate::test_support::{MockInference, Reply};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const LISTING: &str = "\
USB Camera A (usb-0000:00:14.0-1):
\t/dev/video0
\t/dev/video1

USB Camera B (usb-0000:00:14.0-2):
\t/dev/video2
\t/dev/video3
";

fn create_test_config(inference_url: &str) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.discovery.probe = ProbeKind::Linux;
    config.capture.timeout_secs = 1;
    config.inference.base_url = inference_url.to_string();
    config.inference.request_timeout_secs = 2;
    config.scheduler.interval_ms = 50;
    config.system.shutdown_timeout_secs = 2;
    config.system.event_bus_capacity = 1024;
    config
}

fn camera_runner() -> Arc<MockProcessRunner> {
    Arc::new(
        MockProcessRunner::new()
            .on("v4l2-ctl", MockResponse::stdout(LISTING))
            .on("ffmpeg", MockResponse::stdout(vec![0xFF, 0xD8, 0xFF, 0xD9])),
    )
}

#[tokio::test]
async fn test_initialize_without_cameras_or_service() {
    let mut config = create_test_config("http://127.0.0.1:9");
    config.discovery.probe = ProbeKind::None;

    let mut orchestrator =
        AgentOrchestrator::with_runner(config, Arc::new(MockProcessRunner::new())).unwrap();
    orchestrator.initialize().await.unwrap();

    let monitor = orchestrator.monitor();
    assert!(monitor.cameras().is_empty());
    assert_eq!(orchestrator.model_source(), Some(ModelSource::Fallback));
    assert_eq!(monitor.models(), vec!["yolov8n", "yolov8s", "yolov8m"]);
    assert_eq!(
        orchestrator.component_state("discovery"),
        Some(ComponentState::Stopped)
    );
    assert_eq!(orchestrator.component_states().len(), 3);
}

#[tokio::test]
async fn test_initialize_prefers_configured_models() {
    let service = MockInference::spawn(Reply::Detections).await;
    let mut config = create_test_config(&service.base_url);
    config.inference.models = vec!["custom".to_string()];

    let mut orchestrator = AgentOrchestrator::with_runner(config, camera_runner()).unwrap();
    orchestrator.initialize().await.unwrap();

    assert_eq!(orchestrator.model_source(), Some(ModelSource::Configured));
    assert_eq!(orchestrator.monitor().models(), vec!["custom"]);
    assert_eq!(orchestrator.monitor().cameras().len(), 2);
}

#[tokio::test]
async fn test_full_lifecycle() {
    let service = MockInference::spawn(Reply::Detections).await;
    let mut orchestrator =
        AgentOrchestrator::with_runner(create_test_config(&service.base_url), camera_runner())
            .unwrap();
    let mut events = orchestrator.event_bus().subscribe();

    orchestrator.initialize().await.unwrap();
    assert_eq!(orchestrator.model_source(), Some(ModelSource::Catalog));

    let monitor = orchestrator.monitor();
    assert_eq!(monitor.cameras().len(), 2);
    assert_eq!(monitor.cameras()[1].stream_url, "http://localhost:8091/stream");

    orchestrator.start().await.unwrap();
    assert_eq!(
        orchestrator.component_state("scheduler"),
        Some(ComponentState::Running)
    );
    assert!(orchestrator.start().await.is_err());

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while monitor.predictions().len() < 4 {
        assert!(tokio::time::Instant::now() < deadline, "no predictions recorded");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(monitor.latest_per_camera().len(), 2);
    assert!(monitor.latest_frame().is_some());
    assert!(monitor.errors().is_empty());

    let exit_code = orchestrator.shutdown().await;
    assert_eq!(exit_code, 0);
    assert_eq!(
        orchestrator.component_state("scheduler"),
        Some(ComponentState::Stopped)
    );
    assert_eq!(monitor.status().cycle_state, CycleState::Idle);

    let mut saw_discovery = false;
    let mut saw_prediction = false;
    while let Ok(event) = events.try_recv() {
        match event {
            AgentEvent::CamerasDiscovered { count } => {
                assert_eq!(count, 2);
                saw_discovery = true;
            }
            AgentEvent::PredictionRecorded { .. } => saw_prediction = true,
            _ => {}
        }
    }
    assert!(saw_discovery);
    assert!(saw_prediction);
}

#[tokio::test]
async fn test_catalog_refresh_replaces_rotation() {
    let service = MockInference::spawn(Reply::Detections).await;
    let config = create_test_config(&service.base_url);
    let catalog = Arc::new(ModelCatalog::new(&config.inference).unwrap());
    let rotator = ModelRotator::shared(vec!["yolov8n".to_string(), "yolov8s".to_string()]);
    let bus = crate::events::EventBus::new(16);
    let mut events = bus.subscribe();
    let token = CancellationToken::new();

    let handle = tokio::spawn(super::startup::refresh_models(
        catalog,
        Arc::clone(&rotator),
        bus.clone(),
        Duration::from_millis(50),
        token.clone(),
    ));

    service.set_models(json!(["yolov8x"]));

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        AgentEvent::ModelsRefreshed { models } => assert_eq!(models, vec!["yolov8x"]),
        other => panic!("Unexpected event: {:?}", other),
    }
    assert_eq!(rotator.lock().current().unwrap(), "yolov8x");

    token.cancel();
    handle.await.unwrap();
}

#[test]
fn test_shutdown_reason_display() {
    assert_eq!(
        ShutdownReason::Signal("SIGTERM".to_string()).to_string(),
        "received SIGTERM"
    );
    assert_eq!(ShutdownReason::UserRequest.to_string(), "user request");
}
