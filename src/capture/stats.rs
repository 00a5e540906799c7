use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters for frame extraction
#[derive(Debug, Default)]
pub struct CaptureStats {
    pub attempts: AtomicU64,
    pub frames: AtomicU64,
    pub timeouts: AtomicU64,
    pub failures: AtomicU64,
    pub bytes: AtomicU64,
}

impl CaptureStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current statistics as a snapshot
    pub fn snapshot(&self) -> CaptureStatsSnapshot {
        CaptureStatsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureStatsSnapshot {
    pub attempts: u64,
    pub frames: u64,
    pub timeouts: u64,
    pub failures: u64,
    pub bytes: u64,
}
