//! Bounded in-memory history of predictions and capture errors

mod buffer;
mod records;
mod store;


pub use buffer::{BoundedHistory, HistoryStats};
pub use records::{ErrorRecord, PredictionRecord};
pub use store::HistoryStore;
