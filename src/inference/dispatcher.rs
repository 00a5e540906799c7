use super::response::interpret_response;
use crate::config::InferenceConfig;
use crate::error::{DispatchError, EdgewatchError, Result};
use crate::frame::{CapturedFrame, LatestFrame};
use crate::history::PredictionRecord;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Upload file name; the service rejects parts without an image extension
const FRAME_FILE_NAME: &str = "frame.jpg";

/// Submits captured frames to the inference service
pub struct PredictionDispatcher {
    client: reqwest::Client,
    predict_url: String,
    threshold: Option<f32>,
    latest_frame: LatestFrame,
    stats: DispatchStats,
}

#[derive(Debug, Default)]
pub struct DispatchStats {
    pub requests: AtomicU64,
    pub predictions: AtomicU64,
    pub failures: AtomicU64,
}

impl DispatchStats {
    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            predictions: self.predictions.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchStatsSnapshot {
    pub requests: u64,
    pub predictions: u64,
    pub failures: u64,
}

impl PredictionDispatcher {
    pub fn new(config: &InferenceConfig, latest_frame: LatestFrame) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| EdgewatchError::component("dispatcher", e.to_string()))?;

        Ok(Self {
            client,
            predict_url: config.endpoint(&config.predict_path),
            threshold: config.threshold,
            latest_frame,
            stats: DispatchStats::default(),
        })
    }

    pub fn predict_url(&self) -> &str {
        &self.predict_url
    }

    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.stats.snapshot()
    }

    /// Run one frame through `model`.
    ///
    /// Failures are logged here and returned for the caller to count; they
    /// never touch the history.
    pub async fn dispatch(
        &self,
        frame: &CapturedFrame,
        model: &str,
    ) -> std::result::Result<PredictionRecord, DispatchError> {
        self.stats.requests.fetch_add(1, Ordering::Relaxed);

        match self.submit(frame, model).await {
            Ok(record) => {
                self.stats.predictions.fetch_add(1, Ordering::Relaxed);
                self.latest_frame.update(frame, record.frame.clone());
                debug!(
                    "Camera {} prediction with {}: {}",
                    frame.camera_id,
                    model,
                    record.summary.describe()
                );
                Ok(record)
            }
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Prediction failed for camera {} with model {}: {}",
                    frame.camera_id, model, e
                );
                Err(e)
            }
        }
    }

    async fn submit(
        &self,
        frame: &CapturedFrame,
        model: &str,
    ) -> std::result::Result<PredictionRecord, DispatchError> {
        let image = Part::bytes(frame.data.to_vec())
            .file_name(FRAME_FILE_NAME)
            .mime_str("image/jpeg")?;

        let mut form = Form::new().part("image", image).text("model", model.to_string());
        if let Some(threshold) = self.threshold {
            form = form.text("threshold", threshold.to_string());
        }

        let response = self
            .client
            .post(&self.predict_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::HttpStatus {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        let payload: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| DispatchError::InvalidResponse {
                    details: e.to_string(),
                })?;
        let summary = interpret_response(&payload)?;

        Ok(PredictionRecord::new(
            frame.camera_id,
            model,
            payload,
            summary,
            frame.encode(),
        ))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
