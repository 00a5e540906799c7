use super::*;
use crate::config::InferenceConfig;
use crate::error::DispatchError;
use crate::frame::{CapturedFrame, LatestFrame};
use crate::test_support::{MockInference, Reply};
use serde_json::json;
use std::time::Duration;

const JPEG: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xD9];

fn config_for(base_url: &str) -> InferenceConfig {
    InferenceConfig {
        base_url: format!("{}/", base_url),
        request_timeout_secs: 2,
        ..InferenceConfig::default()
    }
}

#[test]
fn test_interpret_detections() {
    let body = json!({
        "success": true,
        "detections": [
            { "id": 0, "class_id": 2, "class_name": "car", "confidence": 0.8,
              "bbox": { "x1": 1.0, "y1": 2.0, "x2": 3.0, "y2": 4.0, "width": 2.0, "height": 2.0 } },
            { "class_name": "person" }
        ]
    });

    match interpret_response(&body).unwrap() {
        PredictionSummary::Detections { count, detections } => {
            assert_eq!(count, 2);
            assert_eq!(detections[0].class_id, 2);
            assert_eq!(detections[0].bbox.width, 2.0);
            assert_eq!(detections[1].bbox, BBox::default());
        }
        other => panic!("Expected detections, got {:?}", other),
    }
}

#[test]
fn test_interpret_empty_detections_is_success() {
    let summary = interpret_response(&json!({ "detections": [] })).unwrap();
    assert_eq!(
        summary,
        PredictionSummary::Detections {
            count: 0,
            detections: Vec::new()
        }
    );
}

#[test]
fn test_interpret_free_form_label() {
    let summary = interpret_response(&json!({ "class": "cat", "confidence": 0.7 })).unwrap();
    assert_eq!(
        summary,
        PredictionSummary::Label {
            label: "cat".to_string(),
            confidence: Some(0.7)
        }
    );

    let numeric = interpret_response(&json!({ "prediction": 3 })).unwrap();
    assert_eq!(numeric.describe(), "3");
}

#[test]
fn test_interpret_failures() {
    assert!(matches!(
        interpret_response(&json!({ "error": "Model 'x' not found" })),
        Err(DispatchError::ServiceError { message }) if message == "Model 'x' not found"
    ));
    assert!(matches!(
        interpret_response(&json!({ "success": false })),
        Err(DispatchError::ServiceError { .. })
    ));
    assert!(matches!(
        interpret_response(&json!(["not", "an", "object"])),
        Err(DispatchError::InvalidResponse { .. })
    ));
    assert!(matches!(
        interpret_response(&json!({ "detections": "garbage" })),
        Err(DispatchError::InvalidResponse { .. })
    ));

    // A null error field is not a failure
    assert_eq!(
        interpret_response(&json!({ "error": null, "status": "ok" })).unwrap(),
        PredictionSummary::Unstructured
    );
}

#[test]
fn test_parse_model_list_shapes() {
    assert_eq!(
        parse_model_list(&json!(["a", "b"])).unwrap(),
        vec!["a".to_string(), "b".to_string()]
    );
    assert_eq!(
        parse_model_list(&json!({ "available_models": ["m1"] })).unwrap(),
        vec!["m1".to_string()]
    );
    assert_eq!(
        parse_model_list(&json!({ "available_models": { "zeta": {}, "alpha": {} } })).unwrap(),
        vec!["alpha".to_string(), "zeta".to_string()]
    );
    assert!(parse_model_list(&json!([])).is_err());
    assert!(parse_model_list(&json!({ "models": ["a"] })).is_err());
}

#[tokio::test]
async fn test_dispatch_success_builds_record() {
    let service = MockInference::spawn(Reply::Detections).await;
    let latest = LatestFrame::new();
    let config = InferenceConfig {
        threshold: Some(0.25),
        ..config_for(&service.base_url)
    };
    let dispatcher = PredictionDispatcher::new(&config, latest.clone()).unwrap();
    assert_eq!(dispatcher.predict_url(), format!("{}/predict", service.base_url));

    let frame = CapturedFrame::new(1, JPEG.to_vec());
    let record = dispatcher.dispatch(&frame, "yolov8s").await.unwrap();

    assert_eq!(record.camera_id, 1);
    assert_eq!(record.model, "yolov8s");
    assert_eq!(record.payload["model_used"], "yolov8s");
    assert!(matches!(
        record.summary,
        PredictionSummary::Detections { count: 1, .. }
    ));
    assert_eq!(record.frame.decode().unwrap(), JPEG.to_vec());

    let requests = service.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model.as_deref(), Some("yolov8s"));
    assert_eq!(requests[0].threshold.as_deref(), Some("0.25"));
    assert_eq!(requests[0].file_name.as_deref(), Some("frame.jpg"));
    assert_eq!(requests[0].content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(requests[0].image, JPEG.to_vec());

    let snapshot = latest.get().unwrap();
    assert_eq!(snapshot.camera_id, 1);
    assert_eq!(dispatcher.stats().predictions, 1);
}

#[tokio::test]
async fn test_dispatch_error_field_yields_no_record() {
    let service = MockInference::spawn(Reply::Json(json!({ "error": "No model specified" }))).await;
    let latest = LatestFrame::new();
    let dispatcher = PredictionDispatcher::new(&config_for(&service.base_url), latest.clone()).unwrap();

    let result = dispatcher
        .dispatch(&CapturedFrame::new(0, JPEG.to_vec()), "yolov8n")
        .await;

    assert!(matches!(result, Err(DispatchError::ServiceError { .. })));
    assert!(latest.get().is_none());
    assert_eq!(dispatcher.stats().failures, 1);
}

#[tokio::test]
async fn test_dispatch_http_error_status() {
    let service = MockInference::spawn(Reply::Status(500)).await;
    let dispatcher =
        PredictionDispatcher::new(&config_for(&service.base_url), LatestFrame::new()).unwrap();

    let result = dispatcher
        .dispatch(&CapturedFrame::new(0, JPEG.to_vec()), "yolov8n")
        .await;
    assert!(matches!(result, Err(DispatchError::HttpStatus { status: 500, .. })));
}

#[tokio::test]
async fn test_dispatch_transport_failure() {
    // Bind then drop to get a port with nothing listening
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dispatcher =
        PredictionDispatcher::new(&config_for(&format!("http://{}", addr)), LatestFrame::new())
            .unwrap();
    let result = dispatcher
        .dispatch(&CapturedFrame::new(0, JPEG.to_vec()), "yolov8n")
        .await;
    assert!(matches!(result, Err(DispatchError::Transport(_))));
}

#[tokio::test]
async fn test_dispatch_request_timeout() {
    let service = MockInference::spawn(Reply::Slow(Duration::from_secs(5))).await;
    let config = InferenceConfig {
        request_timeout_secs: 1,
        ..config_for(&service.base_url)
    };
    let dispatcher = PredictionDispatcher::new(&config, LatestFrame::new()).unwrap();

    let result = dispatcher
        .dispatch(&CapturedFrame::new(0, JPEG.to_vec()), "yolov8n")
        .await;
    assert!(matches!(result, Err(DispatchError::Transport(e)) if e.is_timeout()));
}

#[tokio::test]
async fn test_catalog_fetch_and_health() {
    let service = MockInference::spawn(Reply::Detections).await;
    let catalog = ModelCatalog::new(&config_for(&service.base_url)).unwrap();

    assert_eq!(
        catalog.fetch().await.unwrap(),
        vec!["yolov8n".to_string(), "yolov8s".to_string()]
    );

    let health = catalog.health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.total_models, 2);
}

#[tokio::test]
async fn test_resolve_models_precedence() {
    let service = MockInference::spawn(Reply::Detections).await;
    let config = config_for(&service.base_url);
    let catalog = ModelCatalog::new(&config).unwrap();

    let configured = InferenceConfig {
        models: vec!["custom".to_string()],
        ..config.clone()
    };
    assert_eq!(
        resolve_models(&configured, &catalog).await,
        (vec!["custom".to_string()], ModelSource::Configured)
    );

    let (models, source) = resolve_models(&config, &catalog).await;
    assert_eq!(source, ModelSource::Catalog);
    assert_eq!(models.len(), 2);

    service.set_models(json!({ "available_models": {}, "total_models": 0 }));
    let (models, source) = resolve_models(&config, &catalog).await;
    assert_eq!(source, ModelSource::Fallback);
    assert_eq!(models, config.fallback_models);
}
