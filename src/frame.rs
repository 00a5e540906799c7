use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One still JPEG grabbed from a camera stream
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub camera_id: u32,
    /// When the extraction finished
    pub captured_at: DateTime<Utc>,
    /// Encoded JPEG bytes (shared ownership, cheap to clone)
    pub data: Bytes,
}

impl CapturedFrame {
    pub fn new(camera_id: u32, data: impl Into<Bytes>) -> Self {
        Self {
            camera_id,
            captured_at: Utc::now(),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check for the JPEG start-of-image marker
    pub fn looks_like_jpeg(&self) -> bool {
        self.data.starts_with(&[0xFF, 0xD8])
    }

    /// Get frame age in milliseconds
    pub fn age_ms(&self) -> i64 {
        (Utc::now() - self.captured_at).num_milliseconds().max(0)
    }

    /// Encode for transport to presentation clients
    pub fn encode(&self) -> EncodedFrame {
        EncodedFrame(format!(
            "data:image/jpeg;base64,{}",
            STANDARD.encode(&self.data)
        ))
    }
}

/// A frame as a `data:` URL, ready to embed in JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedFrame(String);

impl EncodedFrame {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the JPEG bytes
    pub fn decode(&self) -> Option<Vec<u8>> {
        let payload = self.0.split_once(',').map(|(_, b)| b)?;
        STANDARD.decode(payload).ok()
    }
}

/// The most recent frame that produced a prediction, from any camera
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub camera_id: u32,
    pub captured_at: DateTime<Utc>,
    pub frame: EncodedFrame,
}

/// Shared slot holding the last dispatched frame. Last writer wins.
#[derive(Debug, Clone, Default)]
pub struct LatestFrame {
    slot: Arc<RwLock<Option<FrameSnapshot>>>,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, frame: &CapturedFrame, encoded: EncodedFrame) {
        *self.slot.write() = Some(FrameSnapshot {
            camera_id: frame.camera_id,
            captured_at: frame.captured_at,
            frame: encoded,
        });
    }

    pub fn get(&self) -> Option<FrameSnapshot> {
        self.slot.read().clone()
    }
}
