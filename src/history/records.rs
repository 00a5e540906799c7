use crate::error::CaptureError;
use crate::frame::EncodedFrame;
use crate::inference::PredictionSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One successful inference result for one camera
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub camera_id: u32,
    pub model: String,
    pub created_at: DateTime<Utc>,
    /// Inference service response as received
    pub payload: serde_json::Value,
    pub summary: PredictionSummary,
    pub frame: EncodedFrame,
}

impl PredictionRecord {
    pub fn new(
        camera_id: u32,
        model: impl Into<String>,
        payload: serde_json::Value,
        summary: PredictionSummary,
        frame: EncodedFrame,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            camera_id,
            model: model.into(),
            created_at: Utc::now(),
            payload,
            summary,
            frame,
        }
    }
}

/// A capture failure kept for the error history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub camera_id: u32,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(camera_id: u32, error: impl Into<String>) -> Self {
        Self {
            camera_id,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}

impl From<&CaptureError> for ErrorRecord {
    fn from(error: &CaptureError) -> Self {
        Self::new(error.camera_id(), error.to_string())
    }
}
