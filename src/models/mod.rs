//! HMM model types
//!
//! Provides the immutable parameter snapshot and the diagonal-Gaussian
//! emission evaluator.

mod gaussian;
mod params;

pub use gaussian::emission_likelihoods;
pub use params::HmmParams;
