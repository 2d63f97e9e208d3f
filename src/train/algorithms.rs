//! Forward-backward recursions and state posteriors
//!
//! The E-step of Baum-Welch for one utterance: scaled alpha/beta matrices,
//! then the occupancy (gamma) and transition (xi) posteriors derived from
//! them. All matrices are `nstates x nframes` with one column per frame;
//! xi is `nstates x nstates x nframes`.

use crate::data::FeatureMatrix;
use crate::error::{TrainError, TrainResult};
use crate::models::{emission_likelihoods, HmmParams};
use ndarray::{Array2, Array3};

/// Per-utterance E-step output, consumed by the M-step
#[derive(Debug, Clone)]
pub struct EStepStats {
    /// Scaled forward probabilities (`nstates x nframes`)
    pub alpha: Array2<f64>,
    /// Scaled backward probabilities (`nstates x nframes`)
    pub beta: Array2<f64>,
    /// State occupancy posteriors (`nstates x nframes`)
    pub gamma: Array2<f64>,
    /// Transition posteriors (`nstates x nstates x nframes`)
    pub xi: Array3<f64>,
}

/// Emission likelihoods of every frame, `nstates x nframes`
fn emission_matrix(features: &FeatureMatrix, params: &HmmParams) -> TrainResult<Array2<f64>> {
    let mut emissions = Array2::zeros((params.nstates(), features.nframes()));
    for t in 0..features.nframes() {
        let p = emission_likelihoods(
            features.data.column(t),
            params.mean_matrix(),
            params.variance_matrix(),
        )?;
        emissions.column_mut(t).assign(&p);
    }
    Ok(emissions)
}

/// Rescale one column to sum to 1; a zero-sum column stays all-zero.
///
/// Zero-sum columns are a valid degenerate state (the model assigns zero
/// probability to the observed sequence), not an error.
fn normalize_column(matrix: &mut Array2<f64>, t: usize) {
    let sum = matrix.column(t).sum();
    if sum != 0.0 {
        matrix.column_mut(t).mapv_inplace(|v| v / sum);
    }
}

/// Compute scaled forward (alpha) and backward (beta) matrices.
///
/// The forward pass is pinned to state 0 at frame 0 and the backward pass
/// to the final state at the last frame; the general initial-state vector
/// plays no role here. Each column is rescaled independently to sum to 1,
/// which is sufficient for the per-frame renormalized posteriors computed
/// downstream.
pub fn forward_backward(
    features: &FeatureMatrix,
    params: &HmmParams,
) -> TrainResult<(Array2<f64>, Array2<f64>)> {
    if features.nfeatures() != params.nfeatures() {
        return Err(TrainError::DimensionMismatch(format!(
            "utterance has {} features, model has {}",
            features.nfeatures(),
            params.nfeatures()
        )));
    }

    let nstates = params.nstates();
    let nframes = features.nframes();
    if nframes == 0 {
        return Err(TrainError::DimensionMismatch(
            "utterance has no frames".to_string(),
        ));
    }

    let a = params.transition_matrix();
    let emissions = emission_matrix(features, params)?;

    let mut alpha = Array2::zeros((nstates, nframes));
    let mut beta = Array2::zeros((nstates, nframes));
    alpha[[0, 0]] = 1.0;
    beta[[nstates - 1, nframes - 1]] = 1.0;

    for t in 1..nframes {
        for q2 in 0..nstates {
            let mut sum = 0.0;
            for q1 in 0..nstates {
                sum += a[[q1, q2]] * alpha[[q1, t - 1]];
            }
            alpha[[q2, t]] = sum * emissions[[q2, t]];
        }

        let s = nframes - 1 - t;
        for q1 in 0..nstates {
            let mut sum = 0.0;
            for q2 in 0..nstates {
                sum += a[[q1, q2]] * beta[[q2, s + 1]];
            }
            beta[[q1, s]] = sum * emissions[[q1, s]];
        }

        normalize_column(&mut alpha, t);
        normalize_column(&mut beta, s);
    }

    Ok((alpha, beta))
}

/// Derive occupancy (gamma) and transition (xi) posteriors.
///
/// `gamma[:,t]` renormalizes `alpha[:,t] * beta[:,t]` per frame; zero-sum
/// frames stay zero. `xi[:,:,t]` is defined for `t >= 1` (frame 0 has no
/// predecessor, so `xi[:,:,0]` stays zero).
pub fn posteriors(
    alpha: &Array2<f64>,
    beta: &Array2<f64>,
    features: &FeatureMatrix,
    params: &HmmParams,
) -> TrainResult<(Array2<f64>, Array3<f64>)> {
    let nstates = params.nstates();
    let nframes = features.nframes();

    if alpha.dim() != (nstates, nframes) || beta.dim() != (nstates, nframes) {
        return Err(TrainError::DimensionMismatch(format!(
            "alpha/beta are {:?}/{:?}, expected ({}, {})",
            alpha.dim(),
            beta.dim(),
            nstates,
            nframes
        )));
    }

    let a = params.transition_matrix();
    let emissions = emission_matrix(features, params)?;

    let mut gamma = Array2::zeros((nstates, nframes));
    let mut xi = Array3::zeros((nstates, nstates, nframes));

    for t in 0..nframes {
        for q in 0..nstates {
            gamma[[q, t]] = alpha[[q, t]] * beta[[q, t]];
        }
        normalize_column(&mut gamma, t);

        if t >= 1 {
            for q2 in 0..nstates {
                for q1 in 0..nstates {
                    xi[[q1, q2, t]] =
                        beta[[q2, t]] * alpha[[q1, t - 1]] * a[[q1, q2]] * emissions[[q2, t]];
                }
            }
        }
    }

    Ok((gamma, xi))
}

/// Full E-step for one utterance against the current parameters
pub fn e_step(features: &FeatureMatrix, params: &HmmParams) -> TrainResult<EStepStats> {
    let (alpha, beta) = forward_backward(features, params)?;
    let (gamma, xi) = posteriors(&alpha, &beta, features, params)?;
    Ok(EStepStats {
        alpha,
        beta,
        gamma,
        xi,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn test_params(nstates: usize, nfeatures: usize) -> HmmParams {
        let means = Array2::from_shape_fn((nfeatures, nstates), |(_, q)| q as f64 * 2.0);
        let variances = Array2::ones((nfeatures, nstates));
        HmmParams::left_to_right(means, variances).unwrap()
    }

    fn test_features(nfeatures: usize, nframes: usize) -> FeatureMatrix {
        FeatureMatrix::new(Array2::from_shape_fn((nfeatures, nframes), |(d, t)| {
            d as f64 * 0.5 + (t % 4) as f64 * 0.25
        }))
    }

    #[test]
    fn test_forward_backward_boundary_columns() {
        let params = test_params(3, 2);
        let features = test_features(2, 8);
        let (alpha, beta) = forward_backward(&features, &params).unwrap();

        // Frame 0 is pinned to state 0, the last frame to the final state
        assert_eq!(alpha[[0, 0]], 1.0);
        assert_eq!(alpha[[1, 0]], 0.0);
        assert_eq!(alpha[[2, 0]], 0.0);
        assert_eq!(beta[[2, 7]], 1.0);
        assert_eq!(beta[[0, 7]], 0.0);
        assert_eq!(beta[[1, 7]], 0.0);
    }

    #[test]
    fn test_forward_backward_columns_normalized() {
        let params = test_params(3, 2);
        let features = test_features(2, 8);
        let (alpha, beta) = forward_backward(&features, &params).unwrap();

        for t in 0..8 {
            let a_sum: f64 = alpha.column(t).sum();
            let b_sum: f64 = beta.column(t).sum();
            assert!((a_sum - 1.0).abs() < 1e-9 || a_sum == 0.0);
            assert!((b_sum - 1.0).abs() < 1e-9 || b_sum == 0.0);
        }
    }

    #[test]
    fn test_gamma_columns_sum_to_one_or_zero() {
        let params = test_params(3, 2);
        let features = test_features(2, 10);
        let stats = e_step(&features, &params).unwrap();

        for t in 0..10 {
            let sum: f64 = stats.gamma.column(t).sum();
            assert!((sum - 1.0).abs() < 1e-9 || sum.abs() < 1e-9);
        }
    }

    #[test]
    fn test_xi_first_frame_is_zero() {
        let params = test_params(2, 1);
        let features = test_features(1, 6);
        let stats = e_step(&features, &params).unwrap();

        for q1 in 0..2 {
            for q2 in 0..2 {
                assert_eq!(stats.xi[[q1, q2, 0]], 0.0);
            }
        }
    }

    #[test]
    fn test_xi_respects_topology() {
        // Structural zeros of the left-to-right transition matrix carry
        // into xi: no backward transitions
        let params = test_params(3, 2);
        let features = test_features(2, 8);
        let stats = e_step(&features, &params).unwrap();

        for t in 1..8 {
            assert_eq!(stats.xi[[1, 0, t]], 0.0);
            assert_eq!(stats.xi[[2, 0, t]], 0.0);
            assert_eq!(stats.xi[[2, 1, t]], 0.0);
            assert_eq!(stats.xi[[0, 2, t]], 0.0);
        }
    }

    #[test]
    fn test_underflowed_columns_stay_zero() {
        // Observations far from every state mean underflow the emission
        // densities; the affected columns must stay all-zero, not NaN
        let means = Array2::zeros((1, 2));
        let variances = Array2::from_elem((1, 2), 1e-4);
        let params = HmmParams::left_to_right(means, variances).unwrap();
        let features = FeatureMatrix::new(Array2::from_elem((1, 5), 100.0));

        let stats = e_step(&features, &params).unwrap();

        for t in 1..5 {
            let sum: f64 = stats.alpha.column(t).sum();
            assert_eq!(sum, 0.0);
        }
        for t in 0..5 {
            for q in 0..2 {
                assert!(!stats.gamma[[q, t]].is_nan());
            }
        }
    }

    #[test]
    fn test_single_state_posteriors_are_unity() {
        let params = test_params(1, 2);
        let features = test_features(2, 6);
        let stats = e_step(&features, &params).unwrap();

        for t in 0..6 {
            assert!((stats.alpha[[0, t]] - 1.0).abs() < 1e-12);
            assert!((stats.beta[[0, t]] - 1.0).abs() < 1e-12);
            assert!((stats.gamma[[0, t]] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_frame_utterance_rejected() {
        let params = test_params(2, 2);
        let features = FeatureMatrix::new(Array2::zeros((2, 0)));
        let result = forward_backward(&features, &params);

        assert!(matches!(result, Err(TrainError::DimensionMismatch(_))));
    }

    #[test]
    fn test_feature_dimension_mismatch() {
        let params = test_params(2, 3);
        let features = test_features(2, 6);
        let result = forward_backward(&features, &params);

        assert!(matches!(result, Err(TrainError::DimensionMismatch(_))));
    }

    #[test]
    fn test_initial_vector_not_used_by_forward_pass() {
        // Two parameter sets differing only in the initial vector produce
        // identical alpha matrices: frame 0 is pinned to state 0
        let params = test_params(2, 1);
        let features = test_features(1, 6);

        let other = HmmParams::new(
            Array1::from_vec(vec![0.25, 0.75]),
            params.transition_matrix().clone(),
            params.mean_matrix().clone(),
            params.variance_matrix().clone(),
        )
        .unwrap();

        let (alpha_a, _) = forward_backward(&features, &params).unwrap();
        let (alpha_b, _) = forward_backward(&features, &other).unwrap();
        assert_eq!(alpha_a, alpha_b);
    }
}
