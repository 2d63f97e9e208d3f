//! Feature-matrix ingestion and training-session state
//!
//! Provides validated containers for externally extracted acoustic
//! features and an incremental session for streaming speech segments.

mod features;
mod session;

pub use features::{FeatureConfig, FeatureMatrix, TrainingSet};
pub use session::TrainingSession;
