//! M-step parameter re-estimation
//!
//! Aggregates the per-utterance posteriors of one E-step into a new
//! parameter snapshot. Any state the training set never occupies makes
//! the update fail outright; a silently degenerate model is worse than a
//! loud error.

use super::algorithms::EStepStats;
use crate::data::FeatureMatrix;
use crate::error::{TrainError, TrainResult};
use crate::models::HmmParams;
use ndarray::{Array1, Array2};

/// Re-estimate a full parameter set from per-utterance posteriors.
///
/// `matrices[i]` and `stats[i]` must describe the same utterance.
pub fn reestimate(
    matrices: &[FeatureMatrix],
    stats: &[EStepStats],
) -> TrainResult<HmmParams> {
    if matrices.is_empty() || matrices.len() != stats.len() {
        return Err(TrainError::DimensionMismatch(format!(
            "{} feature matrices against {} posterior sets",
            matrices.len(),
            stats.len()
        )));
    }

    // Re-estimation reads frame 1 of every alpha/beta pair
    for (i, s) in stats.iter().enumerate() {
        if s.alpha.ncols() < 2 {
            return Err(TrainError::DimensionMismatch(format!(
                "utterance {} has {} frames, need at least 2 for re-estimation",
                i,
                s.alpha.ncols()
            )));
        }
    }

    let initial_state_vector = new_initial_state_vector(stats);
    let transition_matrix = new_transition_matrix(stats)?;
    let mean_matrix = new_mean_matrix(matrices, stats)?;
    let variance_matrix = new_variance_matrix(matrices, stats, &mean_matrix)?;

    HmmParams::new(
        initial_state_vector,
        transition_matrix,
        mean_matrix,
        variance_matrix,
    )
}

/// Average the frame-1 occupancy across utterances.
///
/// Frame 0 is the forced start, so frame 1 is the earliest frame carrying
/// information about the entry distribution.
fn new_initial_state_vector(stats: &[EStepStats]) -> Array1<f64> {
    let nstates = stats[0].alpha.nrows();
    let mut initial = Array1::zeros(nstates);

    for s in stats {
        let mut ab = Array1::zeros(nstates);
        let mut ab_sum = 0.0;
        for q in 0..nstates {
            ab[q] = s.alpha[[q, 1]] * s.beta[[q, 1]];
            ab_sum += ab[q];
        }
        if ab_sum != 0.0 {
            for q in 0..nstates {
                initial[q] += ab[q] / ab_sum;
            }
        }
    }

    initial /= stats.len() as f64;
    let total = initial.sum();
    if total != 0.0 {
        initial /= total;
    }
    initial
}

/// Transition counts over frames `t >= 2`.
///
/// The first two frames are excluded so the forced frame-0 start does not
/// leak into the transition statistics.
fn new_transition_matrix(stats: &[EStepStats]) -> TrainResult<Array2<f64>> {
    let nstates = stats[0].gamma.nrows();
    let mut numerator = Array2::<f64>::zeros((nstates, nstates));
    let mut denominator = Array1::<f64>::zeros(nstates);

    for s in stats {
        let nframes = s.gamma.ncols();
        for t in 2..nframes {
            for q1 in 0..nstates {
                denominator[q1] += s.gamma[[q1, t]];
                for q2 in 0..nstates {
                    numerator[[q1, q2]] += s.xi[[q1, q2, t]];
                }
            }
        }
    }

    let mut transition = Array2::zeros((nstates, nstates));
    for q1 in 0..nstates {
        if denominator[q1] == 0.0 {
            return Err(TrainError::UnderdeterminedState { state: q1 });
        }
        for q2 in 0..nstates {
            transition[[q1, q2]] = numerator[[q1, q2]] / denominator[q1];
        }

        let row_sum: f64 = transition.row(q1).sum();
        if row_sum != 0.0 {
            for q2 in 0..nstates {
                transition[[q1, q2]] /= row_sum;
            }
        }
    }

    Ok(transition)
}

/// Occupancy-weighted feature means, one state at a time
fn new_mean_matrix(
    matrices: &[FeatureMatrix],
    stats: &[EStepStats],
) -> TrainResult<Array2<f64>> {
    let nstates = stats[0].gamma.nrows();
    let nfeatures = matrices[0].nfeatures();
    let mut mean_matrix = Array2::zeros((nfeatures, nstates));

    for q in 0..nstates {
        let mut numerator = Array1::<f64>::zeros(nfeatures);
        let mut denominator = 0.0;

        for (m, s) in matrices.iter().zip(stats) {
            for t in 0..m.nframes() {
                let w = s.gamma[[q, t]];
                denominator += w;
                for d in 0..nfeatures {
                    numerator[d] += m.data[[d, t]] * w;
                }
            }
        }

        if denominator == 0.0 {
            return Err(TrainError::UnderdeterminedState { state: q });
        }
        for d in 0..nfeatures {
            mean_matrix[[d, q]] = numerator[d] / denominator;
        }
    }

    Ok(mean_matrix)
}

/// Occupancy-weighted squared deviations about the new means
fn new_variance_matrix(
    matrices: &[FeatureMatrix],
    stats: &[EStepStats],
    mean_matrix: &Array2<f64>,
) -> TrainResult<Array2<f64>> {
    let nstates = stats[0].gamma.nrows();
    let nfeatures = matrices[0].nfeatures();
    let mut variance_matrix = Array2::zeros((nfeatures, nstates));

    for q in 0..nstates {
        let mut numerator = Array1::<f64>::zeros(nfeatures);
        let mut denominator = 0.0;

        for (m, s) in matrices.iter().zip(stats) {
            for t in 0..m.nframes() {
                let w = s.gamma[[q, t]];
                denominator += w;
                for d in 0..nfeatures {
                    let diff = m.data[[d, t]] - mean_matrix[[d, q]];
                    numerator[d] += diff * diff * w;
                }
            }
        }

        if denominator == 0.0 {
            return Err(TrainError::UnderdeterminedState { state: q });
        }
        for d in 0..nfeatures {
            variance_matrix[[d, q]] = numerator[d] / denominator;
        }
    }

    Ok(variance_matrix)
}
