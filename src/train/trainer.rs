//! EM convergence driver
//!
//! Alternates E-steps (forward-backward + posteriors per utterance) and
//! M-steps (re-estimation over the whole set) until the largest relative
//! parameter change falls at or below the threshold. E-steps of distinct
//! utterances only read the current immutable snapshot, so they run in
//! parallel; the M-step aggregation is serial.

use super::algorithms::{e_step, EStepStats};
use super::observer::{EStepSnapshot, TrainObserver};
use super::reestimate::reestimate;
use crate::data::TrainingSet;
use crate::error::{TrainError, TrainResult};
use crate::models::HmmParams;
use ndarray::{Array2, ArrayViewD, Axis};
use rayon::prelude::*;

/// Default convergence threshold on the relative parameter delta
pub const DEFAULT_THRESHOLD: f64 = 0.05;

/// Default safety bound on EM iterations
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Baum-Welch trainer for one left-to-right HMM
pub struct HmmTrainer {
    nstates: usize,
    threshold: f64,
    max_iterations: usize,
    observer: Option<Box<dyn TrainObserver>>,
}

impl HmmTrainer {
    /// Create a trainer for an `nstates`-state model with default settings
    pub fn new(nstates: usize) -> Self {
        Self {
            nstates,
            threshold: DEFAULT_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            observer: None,
        }
    }

    /// Set the convergence threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the iteration safety bound
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Install a diagnostics observer
    pub fn with_observer(mut self, observer: Box<dyn TrainObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run EM until convergence and return the final parameter set.
    ///
    /// Fails with [`TrainError::NonConvergence`] when the safety bound is
    /// reached first; no partial parameter set is ever returned.
    pub fn train(&mut self, set: &TrainingSet) -> TrainResult<HmmParams> {
        let mut params = self.initialize(set)?;

        for iteration in 0..self.max_iterations {
            let stats: Vec<EStepStats> = set
                .matrices()
                .par_iter()
                .map(|m| e_step(m, &params))
                .collect::<TrainResult<_>>()?;

            if let (Some(observer), Some(last)) = (self.observer.as_deref_mut(), stats.last()) {
                observer.on_estep(&EStepSnapshot {
                    iteration,
                    alpha: &last.alpha,
                    beta: &last.beta,
                    gamma: &last.gamma,
                });
            }

            let candidate = reestimate(set.matrices(), &stats)?;
            let delta = hmm_delta(&params, &candidate);
            tracing::debug!("iteration {}: delta = {:.6}", iteration + 1, delta);

            if delta <= self.threshold {
                tracing::info!("converged after {} iterations", iteration + 1);
                return Ok(candidate);
            }
            params = candidate;
        }

        Err(TrainError::NonConvergence {
            iterations: self.max_iterations,
        })
    }

    /// Flat starting point from global feature statistics.
    ///
    /// Every state starts with the same emission parameters: the mean over
    /// utterances of the per-utterance frame means, and likewise of the
    /// per-utterance frame-wise population variances.
    fn initialize(&self, set: &TrainingSet) -> TrainResult<HmmParams> {
        if self.nstates == 0 {
            return Err(TrainError::DimensionMismatch(
                "trainer configured with zero states".to_string(),
            ));
        }

        let nfeatures = set.nfeatures();
        let mut mean_vector = ndarray::Array1::zeros(nfeatures);
        let mut variance_vector = ndarray::Array1::zeros(nfeatures);

        for m in set.matrices() {
            let utterance_mean = m.data.mean_axis(Axis(1)).ok_or_else(|| {
                TrainError::DimensionMismatch("utterance has no frames".to_string())
            })?;
            mean_vector += &utterance_mean;
            variance_vector += &m.data.var_axis(Axis(1), 0.0);
        }
        mean_vector /= set.len() as f64;
        variance_vector /= set.len() as f64;

        let mean_matrix =
            Array2::from_shape_fn((nfeatures, self.nstates), |(d, _)| mean_vector[d]);
        let variance_matrix =
            Array2::from_shape_fn((nfeatures, self.nstates), |(d, _)| variance_vector[d]);

        HmmParams::left_to_right(mean_matrix, variance_matrix)
    }
}

/// Train with default threshold and iteration bound
pub fn train_hmm(set: &TrainingSet, nstates: usize) -> TrainResult<HmmParams> {
    HmmTrainer::new(nstates).train(set)
}

/// Relative elementwise change between two parameter sets.
///
/// Maximum over the four arrays of `sum|old - new| / sum(|old| + |new|)`,
/// taking 0 for a pair of all-zero arrays.
pub(crate) fn hmm_delta(old: &HmmParams, new: &HmmParams) -> f64 {
    let deltas = [
        delta_fraction(
            old.initial_state_vector().view().into_dyn(),
            new.initial_state_vector().view().into_dyn(),
        ),
        delta_fraction(
            old.transition_matrix().view().into_dyn(),
            new.transition_matrix().view().into_dyn(),
        ),
        delta_fraction(
            old.mean_matrix().view().into_dyn(),
            new.mean_matrix().view().into_dyn(),
        ),
        delta_fraction(
            old.variance_matrix().view().into_dyn(),
            new.variance_matrix().view().into_dyn(),
        ),
    ];
    deltas.into_iter().fold(0.0, f64::max)
}

fn delta_fraction(old: ArrayViewD<'_, f64>, new: ArrayViewD<'_, f64>) -> f64 {
    let denominator: f64 = old
        .iter()
        .zip(new.iter())
        .map(|(a, b)| a.abs() + b.abs())
        .sum();
    if denominator == 0.0 {
        return 0.0;
    }
    let numerator: f64 = old
        .iter()
        .zip(new.iter())
        .map(|(a, b)| (a - b).abs())
        .sum();
    numerator / denominator
}
