//! In-process stand-in for the inference service

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// What the mock answers to `POST /predict`
#[derive(Debug, Clone)]
pub enum Reply {
    /// One detection naming the requested model
    Detections,
    Json(Value),
    Status(u16),
    /// Detections after a pause
    Slow(Duration),
}

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub model: Option<String>,
    pub threshold: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub image: Vec<u8>,
}

#[derive(Clone)]
struct MockState {
    reply: Arc<Mutex<Reply>>,
    models: Arc<Mutex<Value>>,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
}

pub struct MockInference {
    pub base_url: String,
    state: MockState,
}

impl MockInference {
    pub async fn spawn(reply: Reply) -> Self {
        let state = MockState {
            reply: Arc::new(Mutex::new(reply)),
            models: Arc::new(Mutex::new(json!({
                "available_models": {
                    "yolov8s": { "classes": ["person"], "class_count": 1 },
                    "yolov8n": { "classes": ["person"], "class_count": 1 }
                },
                "total_models": 2
            }))),
            requests: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/predict", post(predict))
            .route("/models", get(models))
            .route("/health", get(health))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.state.reply.lock() = reply;
    }

    pub fn set_models(&self, listing: Value) {
        *self.state.models.lock() = listing;
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.state.requests.lock().clone()
    }
}

async fn predict(State(state): State<MockState>, mut multipart: Multipart) -> Response {
    let mut seen = SeenRequest {
        model: None,
        threshold: None,
        file_name: None,
        content_type: None,
        image: Vec::new(),
    };

    while let Some(field) = multipart.next_field().await.unwrap() {
        match field.name().unwrap_or_default().to_string().as_str() {
            "image" => {
                seen.file_name = field.file_name().map(str::to_string);
                seen.content_type = field.content_type().map(str::to_string);
                seen.image = field.bytes().await.unwrap().to_vec();
            }
            "model" => seen.model = Some(field.text().await.unwrap()),
            "threshold" => seen.threshold = Some(field.text().await.unwrap()),
            _ => {}
        }
    }

    let model = seen.model.clone().unwrap_or_default();
    state.requests.lock().push(seen);

    let reply = state.reply.lock().clone();
    match reply {
        Reply::Detections => Json(detections(&model)).into_response(),
        Reply::Slow(pause) => {
            tokio::time::sleep(pause).await;
            Json(detections(&model)).into_response()
        }
        Reply::Json(body) => Json(body).into_response(),
        Reply::Status(code) => (
            StatusCode::from_u16(code).unwrap(),
            Json(json!({ "success": false, "error": "boom" })),
        )
            .into_response(),
    }
}

fn detections(model: &str) -> Value {
    json!({
        "success": true,
        "model_used": model,
        "threshold": 0.5,
        "image_filename": "frame.jpg",
        "detections_count": 1,
        "detections": [{
            "id": 0,
            "class_id": 0,
            "class_name": "person",
            "confidence": 0.91,
            "bbox": { "x1": 10.0, "y1": 20.0, "x2": 110.0, "y2": 220.0, "width": 100.0, "height": 200.0 }
        }]
    })
}

async fn models(State(state): State<MockState>) -> Json<Value> {
    Json(state.models.lock().clone())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "available_models": ["yolov8n", "yolov8s"],
        "total_models": 2
    }))
}
