//! HMM parameter container

use crate::error::{TrainError, TrainResult};
use ndarray::{Array1, Array2};

/// One immutable snapshot of HMM parameters.
///
/// Emission distributions are diagonal-covariance Gaussians: column `q` of
/// the mean and variance matrices holds state `q`'s per-dimension mean and
/// variance. Each EM iteration produces a fresh snapshot; a snapshot is
/// never mutated in place.
#[derive(Debug, Clone)]
pub struct HmmParams {
    nstates: usize,
    nfeatures: usize,
    initial_state_vector: Array1<f64>,
    transition_matrix: Array2<f64>,
    mean_matrix: Array2<f64>,
    variance_matrix: Array2<f64>,
}

impl HmmParams {
    /// Build a parameter set, validating shapes and variance positivity
    pub fn new(
        initial_state_vector: Array1<f64>,
        transition_matrix: Array2<f64>,
        mean_matrix: Array2<f64>,
        variance_matrix: Array2<f64>,
    ) -> TrainResult<Self> {
        let nstates = initial_state_vector.len();
        if nstates == 0 {
            return Err(TrainError::DimensionMismatch(
                "initial state vector is empty".to_string(),
            ));
        }

        if transition_matrix.dim() != (nstates, nstates) {
            return Err(TrainError::DimensionMismatch(format!(
                "transition matrix is {:?}, expected ({}, {})",
                transition_matrix.dim(),
                nstates,
                nstates
            )));
        }

        if mean_matrix.ncols() != nstates || variance_matrix.ncols() != nstates {
            return Err(TrainError::DimensionMismatch(format!(
                "mean/variance matrices have {}/{} state columns, expected {}",
                mean_matrix.ncols(),
                variance_matrix.ncols(),
                nstates
            )));
        }

        let nfeatures = mean_matrix.nrows();
        if variance_matrix.nrows() != nfeatures {
            return Err(TrainError::DimensionMismatch(format!(
                "variance matrix has {} feature rows, mean matrix has {}",
                variance_matrix.nrows(),
                nfeatures
            )));
        }

        for ((d, q), &v) in variance_matrix.indexed_iter() {
            if v <= 0.0 {
                return Err(TrainError::Domain {
                    feature: d,
                    state: q,
                    value: v,
                });
            }
        }

        Ok(Self {
            nstates,
            nfeatures,
            initial_state_vector,
            transition_matrix,
            mean_matrix,
            variance_matrix,
        })
    }

    /// Build the fixed left-to-right starting point around given emissions.
    ///
    /// Every non-final state stays with probability 0.5 or advances one
    /// state; the final state self-loops with probability 1. The initial
    /// vector decays as `0.5^((i+1)^2)` with the leftover mass folded into
    /// state 0 so it sums to 1.
    pub fn left_to_right(
        mean_matrix: Array2<f64>,
        variance_matrix: Array2<f64>,
    ) -> TrainResult<Self> {
        let nstates = mean_matrix.ncols();
        if nstates == 0 {
            return Err(TrainError::DimensionMismatch(
                "mean matrix has zero state columns".to_string(),
            ));
        }

        let mut transition_matrix = Array2::zeros((nstates, nstates));
        for i in 0..nstates.saturating_sub(1) {
            transition_matrix[[i, i]] = 0.5;
            transition_matrix[[i, i + 1]] = 0.5;
        }
        transition_matrix[[nstates - 1, nstates - 1]] = 1.0;

        let mut initial_state_vector = Array1::zeros(nstates);
        for i in 0..nstates {
            initial_state_vector[i] = 0.5_f64.powi(((i + 1) * (i + 1)) as i32);
        }
        initial_state_vector[0] += 1.0 - initial_state_vector.sum();

        Self::new(
            initial_state_vector,
            transition_matrix,
            mean_matrix,
            variance_matrix,
        )
    }

    /// Number of states, including the entry and final state
    pub fn nstates(&self) -> usize {
        self.nstates
    }

    /// Feature dimensionality of the emission model
    pub fn nfeatures(&self) -> usize {
        self.nfeatures
    }

    /// Initial state distribution (length `nstates`, sums to 1)
    pub fn initial_state_vector(&self) -> &Array1<f64> {
        &self.initial_state_vector
    }

    /// Row-stochastic transition matrix (`nstates x nstates`)
    pub fn transition_matrix(&self) -> &Array2<f64> {
        &self.transition_matrix
    }

    /// Per-state emission means (`nfeatures x nstates`)
    pub fn mean_matrix(&self) -> &Array2<f64> {
        &self.mean_matrix
    }

    /// Per-state emission variances (`nfeatures x nstates`, all positive)
    pub fn variance_matrix(&self) -> &Array2<f64> {
        &self.variance_matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_left_to_right_structure() {
        let means = Array2::zeros((2, 4));
        let variances = Array2::ones((2, 4));
        let params = HmmParams::left_to_right(means, variances).unwrap();

        let a = params.transition_matrix();
        for i in 0..3 {
            assert!((a[[i, i]] - 0.5).abs() < 1e-12);
            assert!((a[[i, i + 1]] - 0.5).abs() < 1e-12);
        }
        assert!((a[[3, 3]] - 1.0).abs() < 1e-12);

        // No backward or skip transitions
        for i in 0..4 {
            for j in 0..4 {
                if j != i && j != i + 1 {
                    assert_eq!(a[[i, j]], 0.0);
                }
            }
        }
    }

    #[test]
    fn test_left_to_right_stochastic_invariants() {
        let params =
            HmmParams::left_to_right(Array2::zeros((3, 5)), Array2::ones((3, 5))).unwrap();

        let pi_sum: f64 = params.initial_state_vector().sum();
        assert!((pi_sum - 1.0).abs() < 1e-9);

        for i in 0..5 {
            let row_sum: f64 = params.transition_matrix().row(i).sum();
            assert!((row_sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_left_to_right_single_state() {
        let params =
            HmmParams::left_to_right(Array2::zeros((2, 1)), Array2::ones((2, 1))).unwrap();

        assert_eq!(params.nstates(), 1);
        assert!((params.transition_matrix()[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((params.initial_state_vector()[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_shape_mismatch() {
        let result = HmmParams::new(
            array![0.5, 0.5],
            Array2::eye(3),
            Array2::zeros((2, 2)),
            Array2::ones((2, 2)),
        );
        assert!(matches!(result, Err(TrainError::DimensionMismatch(_))));
    }

    #[test]
    fn test_rejects_nonpositive_variance() {
        let mut variances = Array2::ones((2, 2));
        variances[[1, 0]] = 0.0;

        let result = HmmParams::new(
            array![0.5, 0.5],
            Array2::eye(2),
            Array2::zeros((2, 2)),
            variances,
        );

        match result {
            Err(TrainError::Domain { feature, state, .. }) => {
                assert_eq!(feature, 1);
                assert_eq!(state, 0);
            }
            other => panic!("expected Domain error, got {:?}", other),
        }
    }
}
