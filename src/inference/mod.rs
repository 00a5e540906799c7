//! Inference service client: prediction submission, response normalization
//! and model catalog lookups

mod catalog;
mod dispatcher;
mod response;

#[cfg(test)]
mod tests;

pub use catalog::{parse_model_list, resolve_models, ModelCatalog, ModelSource, ServiceHealth};
pub use dispatcher::{DispatchStats, DispatchStatsSnapshot, PredictionDispatcher};
pub use response::{interpret_response, BBox, Detection, PredictionSummary};
