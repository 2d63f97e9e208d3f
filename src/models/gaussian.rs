//! Diagonal-covariance Gaussian emission likelihoods

use crate::error::{TrainError, TrainResult};
use ndarray::{Array1, Array2, ArrayView1};
use std::f64::consts::PI;

/// Evaluate per-state emission likelihoods of one feature vector.
///
/// Column `q` of the mean and variance matrices holds state `q`'s
/// diagonal Gaussian. Returns a length-`nstates` vector where entry `q`
/// is
///
/// ```text
/// p(x|q) = exp(-0.5 * sum_d (x_d - mean[d,q])^2 / var[d,q])
///          / ((2*pi)^(nfeatures/2) * sqrt(prod_d var[d,q]))
/// ```
///
/// Any variance entry <= 0 fails with [`TrainError::Domain`] before any
/// density is evaluated.
pub fn emission_likelihoods(
    x: ArrayView1<'_, f64>,
    mean_matrix: &Array2<f64>,
    variance_matrix: &Array2<f64>,
) -> TrainResult<Array1<f64>> {
    let nfeatures = mean_matrix.nrows();
    let nstates = mean_matrix.ncols();

    if x.len() != nfeatures || variance_matrix.dim() != (nfeatures, nstates) {
        return Err(TrainError::DimensionMismatch(format!(
            "feature vector of length {} against {}x{} emission parameters",
            x.len(),
            nfeatures,
            nstates
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

    // Normalizing exponent ranges over the feature dimension
    let norm = (2.0 * PI).powf(nfeatures as f64 / 2.0);

    let mut likelihoods = Array1::zeros(nstates);
    for q in 0..nstates {
        let mut exponent = 0.0;
        let mut det = 1.0;
        for d in 0..nfeatures {
            let diff = x[d] - mean_matrix[[d, q]];
            exponent += diff * diff / variance_matrix[[d, q]];
            det *= variance_matrix[[d, q]];
        }
        likelihoods[q] = (-0.5 * exponent).exp() / (norm * det.sqrt());
    }

    Ok(likelihoods)
}
