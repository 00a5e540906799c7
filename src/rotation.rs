use crate::error::RotationError;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Rotation shared by the scheduler, the catalog refresher and accessors
pub type SharedRotator = Arc<Mutex<ModelRotator>>;

/// Round-robin model selection, one step per capture cycle
#[derive(Debug, Clone, Default)]
pub struct ModelRotator {
    models: Vec<String>,
    index: usize,
}

impl ModelRotator {
    pub fn new(models: Vec<String>) -> Self {
        Self { models, index: 0 }
    }

    pub fn shared(models: Vec<String>) -> SharedRotator {
        Arc::new(Mutex::new(Self::new(models)))
    }

    /// Model for the current cycle
    pub fn current(&self) -> Result<&str, RotationError> {
        self.models
            .get(self.index)
            .map(String::as_str)
            .ok_or(RotationError::EmptyRotation)
    }

    /// Step the cursor one position, wrapping. No-op on an empty rotation.
    pub fn advance(&mut self) {
        if self.models.is_empty() {
            return;
        }
        self.index = (self.index + 1) % self.models.len();
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Swap in a refreshed model list, keeping the cursor in range
    pub fn replace_models(&mut self, models: Vec<String>) {
        self.index = match models.len() {
            0 => 0,
            len => self.index % len,
        };
        debug!(
            "Model rotation replaced with {} models, cursor at {}",
            models.len(),
            self.index
        );
        self.models = models;
    }
}
