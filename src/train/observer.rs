//! Diagnostics hook for visualization frontends

use ndarray::Array2;

/// Matrices of the last utterance processed in one E-step
#[derive(Debug)]
pub struct EStepSnapshot<'a> {
    /// Zero-based EM iteration index
    pub iteration: usize,
    /// Scaled forward probabilities (`nstates x nframes`)
    pub alpha: &'a Array2<f64>,
    /// Scaled backward probabilities (`nstates x nframes`)
    pub beta: &'a Array2<f64>,
    /// State occupancy posteriors (`nstates x nframes`)
    pub gamma: &'a Array2<f64>,
}

/// Observer invoked once per E-step.
///
/// Intended for plotting or logging intermediate matrices; the trainer
/// works identically with or without one installed and never waits on it.
pub trait TrainObserver {
    /// Called after each E-step with the last-processed utterance
    fn on_estep(&mut self, snapshot: &EStepSnapshot<'_>);
}
