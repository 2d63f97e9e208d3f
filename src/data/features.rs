//! Feature-matrix ingestion
//!
//! Feature matrices are produced by an external feature-extraction
//! collaborator (filter-bank analysis over fixed-duration frames); the
//! training core consumes them as-is and only validates their shapes.

use crate::error::{TrainError, TrainResult};
use ndarray::Array2;

/// Configuration of the feature-extraction collaborator.
///
/// The trainer never runs feature extraction itself; this record travels
/// with a training session so that a downstream decoder can reproduce the
/// exact front-end the model was trained against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureConfig {
    /// Analysis window duration in seconds
    pub window_duration: f64,
    /// Frame skip duration in seconds
    pub skip_duration: f64,
    /// Number of filter-bank channels
    pub nfilters: usize,
    /// Number of channels retained per frame
    pub nfilters_keep: usize,
    /// Context radius in frames (stacked neighbors on each side)
    pub radius: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window_duration: 0.025,
            skip_duration: 0.010,
            nfilters: 26,
            nfilters_keep: 13,
            radius: 2,
        }
    }
}

/// One utterance's feature matrix, `nfeatures x nframes`.
///
/// Column `t` holds the feature vector of frame `t`.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    /// Feature values (rows = feature dimensions, cols = frames)
    pub data: Array2<f64>,
}

impl FeatureMatrix {
    /// Wrap an externally produced feature matrix
    pub fn new(data: Array2<f64>) -> Self {
        Self { data }
    }

    /// Number of feature dimensions
    pub fn nfeatures(&self) -> usize {
        self.data.nrows()
    }

    /// Number of frames
    pub fn nframes(&self) -> usize {
        self.data.ncols()
    }
}

/// Validated collection of training utterances.
///
/// All matrices share one `nfeatures`, and every utterance carries enough
/// frames for the transition-count window used by re-estimation.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    matrices: Vec<FeatureMatrix>,
    nfeatures: usize,
}

impl TrainingSet {
    /// Minimum frames per utterance (re-estimation sums start at frame 2)
    pub const MIN_FRAMES: usize = 3;

    /// Validate and build a training set from per-utterance matrices
    pub fn new(matrices: Vec<FeatureMatrix>) -> TrainResult<Self> {
        let first = matrices
            .first()
            .ok_or_else(|| TrainError::DimensionMismatch("training set is empty".to_string()))?;

        let nfeatures = first.nfeatures();
        if nfeatures == 0 {
            return Err(TrainError::DimensionMismatch(
                "feature matrices have zero feature dimensions".to_string(),
            ));
        }

        for (i, m) in matrices.iter().enumerate() {
            if m.nfeatures() != nfeatures {
                return Err(TrainError::DimensionMismatch(format!(
                    "utterance {} has {} features, expected {}",
                    i,
                    m.nfeatures(),
                    nfeatures
                )));
            }
            if m.nframes() < Self::MIN_FRAMES {
                return Err(TrainError::DimensionMismatch(format!(
                    "utterance {} has {} frames, need at least {}",
                    i,
                    m.nframes(),
                    Self::MIN_FRAMES
                )));
            }
        }

        Ok(Self { matrices, nfeatures })
    }

    /// Shared feature dimensionality
    pub fn nfeatures(&self) -> usize {
        self.nfeatures
    }

    /// Number of utterances
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    /// Whether the set holds no utterances
    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    /// Per-utterance feature matrices
    pub fn matrices(&self) -> &[FeatureMatrix] {
        &self.matrices
    }
}
