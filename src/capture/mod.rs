mod core;
mod stats;
#[cfg(test)]
mod tests;

pub use self::core::FrameCapture;
pub use stats::{CaptureStats, CaptureStatsSnapshot};
