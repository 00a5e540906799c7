//! Fixed-interval capture cycle driver

mod core;
mod types;


pub use self::core::{PollingScheduler, PollingSchedulerBuilder};
pub use types::{
    CameraOutcome, CycleReport, CycleState, SchedulerStats, SchedulerStatsSnapshot, SkipReason,
};
