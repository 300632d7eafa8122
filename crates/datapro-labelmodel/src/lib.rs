//! datapro-labelmodel: a generative label model for data programming.
//!
//! Noisy heuristic labeling functions vote positive, negative or abstain on
//! each example. This crate collects those votes into a sparse labeling
//! matrix, learns how reliable each source is without ground truth, and turns
//! the votes into per-example posterior probabilities that a downstream
//! classifier can train on.
//!
//! The fitting and inference code lives in [`model`]; the remaining modules
//! cover matrix construction, the labeling-function protocol, source
//! statistics, parameter persistence and file I/O.
pub mod config;
pub mod error;
pub mod io;
pub mod labeling;
pub mod matrix;
pub mod model;
pub mod source;
pub mod stats;
pub mod store;
pub mod vote;

pub use config::{DivergencePolicy, FitConfig};
pub use error::LabelModelError;
pub use matrix::{Example, LabelingMatrix, LabelingMatrixBuilder};
pub use model::{fit, marginals, FittedModel, MarginalEstimates};
pub use vote::Vote;
