use super::buffer::{BoundedHistory, HistoryStats};
use super::records::{ErrorRecord, PredictionRecord};
use crate::config::HistoryConfig;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

/// Recent predictions and capture errors, both newest-first and capped
pub struct HistoryStore {
    predictions: RwLock<BoundedHistory<PredictionRecord>>,
    errors: RwLock<BoundedHistory<ErrorRecord>>,
}

impl HistoryStore {
    pub fn new(config: &HistoryConfig) -> Self {
        Self::with_capacity(config.max_predictions, config.max_errors)
    }

    pub fn with_capacity(max_predictions: usize, max_errors: usize) -> Self {
        debug!(
            "Created history store (predictions: {}, errors: {})",
            max_predictions, max_errors
        );
        Self {
            predictions: RwLock::new(BoundedHistory::new(max_predictions)),
            errors: RwLock::new(BoundedHistory::new(max_errors)),
        }
    }

    pub fn record_prediction(&self, record: PredictionRecord) {
        self.predictions.write().push(record);
    }

    /// Commit one cycle's predictions under a single lock acquisition
    pub fn record_predictions(&self, records: Vec<PredictionRecord>) -> usize {
        if records.is_empty() {
            return 0;
        }
        self.predictions.write().push_batch(records)
    }

    pub fn record_error(&self, record: ErrorRecord) {
        self.errors.write().push(record);
    }

    pub fn record_errors(&self, records: Vec<ErrorRecord>) -> usize {
        if records.is_empty() {
            return 0;
        }
        self.errors.write().push_batch(records)
    }

    /// All predictions, newest-first
    pub fn predictions(&self) -> Vec<PredictionRecord> {
        self.predictions.read().to_vec()
    }

    /// All capture errors, newest-first
    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.errors.read().to_vec()
    }

    /// Most recent prediction per camera, judged by creation time
    pub fn latest_per_camera(&self) -> BTreeMap<u32, PredictionRecord> {
        let predictions = self.predictions.read();
        let mut latest: BTreeMap<u32, PredictionRecord> = BTreeMap::new();

        for record in predictions.iter() {
            match latest.get(&record.camera_id) {
                Some(existing) if existing.created_at >= record.created_at => {}
                _ => {
                    latest.insert(record.camera_id, record.clone());
                }
            }
        }

        latest
    }

    /// Predictions for one camera, newest-first
    pub fn by_camera(&self, camera_id: u32) -> Vec<PredictionRecord> {
        self.predictions
            .read()
            .iter()
            .filter(|r| r.camera_id == camera_id)
            .cloned()
            .collect()
    }

    pub fn prediction_count(&self) -> usize {
        self.predictions.read().len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.read().len()
    }

    pub fn prediction_stats(&self) -> HistoryStats {
        self.predictions.read().stats()
    }

    pub fn error_stats(&self) -> HistoryStats {
        self.errors.read().stats()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(&HistoryConfig::default())
    }
}
