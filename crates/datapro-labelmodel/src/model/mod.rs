//! The generative label model.
//!
//! `estimator` learns per-source reliabilities from an unlabeled matrix,
//! `inference` turns votes into posteriors with a fitted model. Both share the
//! log-space probability model in `likelihood`.
pub mod estimator;
pub mod fitted;
pub mod inference;
pub mod likelihood;

pub use estimator::fit;
pub use fitted::{FitDiagnostics, FittedModel, LikelihoodSample};
pub use inference::{marginals, marginals_aligned, predict, Marginal, MarginalEstimates};
