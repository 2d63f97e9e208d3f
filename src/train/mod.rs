//! Baum-Welch training
//!
//! Forward-backward E-step, M-step re-estimation, and the convergence
//! driver that alternates them.

mod algorithms;
mod observer;
mod reestimate;
mod trainer;

pub use algorithms::{e_step, forward_backward, posteriors, EStepStats};
pub use observer::{EStepSnapshot, TrainObserver};
pub use reestimate::reestimate;
pub use trainer::{train_hmm, HmmTrainer, DEFAULT_MAX_ITERATIONS, DEFAULT_THRESHOLD};
