//! Training error types

use thiserror::Error;

/// Errors raised during HMM training
#[derive(Error, Debug)]
pub enum TrainError {
    #[error("non-positive variance {value} at feature {feature}, state {state}")]
    Domain {
        feature: usize,
        state: usize,
        value: f64,
    },

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("state {state} has zero aggregate occupancy in the training set")]
    UnderdeterminedState { state: usize },

    #[error("EM did not converge within {iterations} iterations")]
    NonConvergence { iterations: usize },
}

/// Result type for training operations
pub type TrainResult<T> = Result<T, TrainError>;
