//! Incremental training session over accumulated speech segments

use super::features::{FeatureConfig, FeatureMatrix, TrainingSet};
use crate::models::HmmParams;
use crate::train::HmmTrainer;

/// Accumulates feature matrices of speech segments and retrains on demand.
///
/// Segments are kept in arrival order; every call to [`train`](Self::train)
/// runs a fresh EM estimation over everything accumulated so far. The
/// session owns its state outright, so several independent sessions can
/// coexist in one process.
#[derive(Debug, Clone)]
pub struct TrainingSession {
    config: FeatureConfig,
    segments: Vec<FeatureMatrix>,
}

impl TrainingSession {
    /// Create an empty session for a fixed front-end configuration
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            config,
            segments: Vec::new(),
        }
    }

    /// Front-end configuration the session's segments were extracted with
    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Append one segment's feature matrix
    pub fn push_segment(&mut self, segment: FeatureMatrix) {
        self.segments.push(segment);
    }

    /// Number of accumulated segments
    pub fn nsegments(&self) -> usize {
        self.segments.len()
    }

    /// Retrain an `nstates`-state model over all accumulated segments
    pub fn train(&self, nstates: usize) -> anyhow::Result<HmmParams> {
        let set = TrainingSet::new(self.segments.clone())?;
        let mut trainer = HmmTrainer::new(nstates);
        Ok(trainer.train(&set)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_session_accumulates_segments() {
        let mut session = TrainingSession::new(FeatureConfig::default());
        assert_eq!(session.nsegments(), 0);

        session.push_segment(FeatureMatrix::new(Array2::zeros((3, 5))));
        session.push_segment(FeatureMatrix::new(Array2::zeros((3, 8))));
        assert_eq!(session.nsegments(), 2);
    }

    #[test]
    fn test_session_train_empty_fails() {
        let session = TrainingSession::new(FeatureConfig::default());
        assert!(session.train(2).is_err());
    }

    #[test]
    fn test_session_train_single_state() {
        let mut session = TrainingSession::new(FeatureConfig::default());
        let data = Array2::from_shape_fn((2, 10), |(d, t)| d as f64 + (t % 3) as f64);
        session.push_segment(FeatureMatrix::new(data));

        let params = session.train(1).unwrap();
        assert_eq!(params.nstates(), 1);
        assert_eq!(params.nfeatures(), 2);
    }
}
