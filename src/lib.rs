//! Baum-Welch (EM) training of left-to-right HMM acoustic models.
//!
//! Takes per-utterance acoustic feature matrices (`nfeatures x nframes`,
//! produced by an external front-end) and estimates a left-to-right HMM
//! with one diagonal-covariance Gaussian emission per state: initial-state
//! distribution, transition matrix, and per-state mean/variance columns.
//!
//! ```no_run
//! use hmm_acoustic::{train_hmm, FeatureMatrix, TrainingSet};
//! use ndarray::Array2;
//!
//! # fn main() -> anyhow::Result<()> {
//! let utterances = vec![
//!     FeatureMatrix::new(Array2::zeros((13, 120))),
//!     FeatureMatrix::new(Array2::zeros((13, 95))),
//! ];
//! let set = TrainingSet::new(utterances)?;
//! let params = train_hmm(&set, 5)?;
//! println!("trained {} states", params.nstates());
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
pub mod models;
pub mod train;

pub use data::{FeatureConfig, FeatureMatrix, TrainingSession, TrainingSet};
pub use error::{TrainError, TrainResult};
pub use models::{emission_likelihoods, HmmParams};
pub use train::{
    e_step, forward_backward, posteriors, reestimate, train_hmm, EStepSnapshot, EStepStats,
    HmmTrainer, TrainObserver,
};
