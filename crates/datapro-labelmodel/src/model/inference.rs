//! Posterior inference with a fitted label model.
use log::{debug, warn};
use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{LabelModelError, Result};
use crate::matrix::LabelingMatrix;
use crate::model::fitted::FittedModel;
use crate::model::likelihood::{posterior, row_log_odds, ClassPrior};
use crate::vote::Vote;

/// Posterior of one example.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Marginal {
    pub example_id: u64,
    /// P(y = +1 | votes).
    pub probability: f64,
    /// Number of non-abstaining votes behind the estimate.
    pub n_votes: usize,
}

/// Per-example posteriors aligned with the rows of the inference matrix.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarginalEstimates {
    marginals: Vec<Marginal>,
}

impl MarginalEstimates {
    pub fn len(&self) -> usize {
        self.marginals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marginals.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Marginal> {
        self.marginals.iter()
    }

    pub fn as_slice(&self) -> &[Marginal] {
        &self.marginals
    }

    pub fn probabilities(&self) -> Array1<f64> {
        self.marginals.iter().map(|m| m.probability).collect()
    }

    /// `(example_id, probability)` pairs in row order.
    pub fn to_pairs(&self) -> Vec<(u64, f64)> {
        self.marginals
            .iter()
            .map(|m| (m.example_id, m.probability))
            .collect()
    }

    /// Look up an example by id, for consumers joining on ids instead of order.
    pub fn get(&self, example_id: u64) -> Option<&Marginal> {
        self.marginals.iter().find(|m| m.example_id == example_id)
    }

    /// Rows estimated without any vote; their probability is the prior.
    pub fn uncovered(&self) -> usize {
        self.marginals.iter().filter(|m| m.n_votes == 0).count()
    }
}

impl<'a> IntoIterator for &'a MarginalEstimates {
    type Item = &'a Marginal;
    type IntoIter = std::slice::Iter<'a, Marginal>;

    fn into_iter(self) -> Self::IntoIter {
        self.marginals.iter()
    }
}

/// Posterior P(y = +1 | votes) for every row of `matrix`.
///
/// Columns are matched to the model's sources by name, so the matrix may
/// carry a subset of the sources in any order; missing sources count as
/// abstentions. A column the model has never seen is an error.
pub fn marginals(model: &FittedModel, matrix: &LabelingMatrix) -> Result<MarginalEstimates> {
    if matrix.is_empty() {
        return Err(LabelModelError::EmptyMatrix);
    }
    let mapping = model.column_mapping(matrix)?;
    Ok(estimate(model, matrix, &mapping))
}

/// Like [`marginals`], but column j of `matrix` is taken to be source j of
/// the model without looking at names.
pub fn marginals_aligned(model: &FittedModel, matrix: &LabelingMatrix) -> Result<MarginalEstimates> {
    if matrix.is_empty() {
        return Err(LabelModelError::EmptyMatrix);
    }
    if matrix.n_sources() != model.n_sources() {
        return Err(LabelModelError::DimensionMismatch {
            expected: model.n_sources(),
            found: matrix.n_sources(),
        });
    }
    let mapping: Vec<usize> = (0..matrix.n_sources()).collect();
    Ok(estimate(model, matrix, &mapping))
}

/// Hard labels from the posteriors. Rows exactly at `threshold` abstain.
pub fn predict(model: &FittedModel, matrix: &LabelingMatrix, threshold: f64) -> Result<Vec<Vote>> {
    let estimates = marginals(model, matrix)?;
    Ok(estimates
        .iter()
        .map(|m| {
            if m.probability > threshold {
                Vote::Positive
            } else if m.probability < threshold {
                Vote::Negative
            } else {
                Vote::Abstain
            }
        })
        .collect())
}

fn estimate(model: &FittedModel, matrix: &LabelingMatrix, mapping: &[usize]) -> MarginalEstimates {
    let prior = ClassPrior::new(model.class_prior());
    let thetas = model.theta_vector();
    let ids = matrix.example_ids();

    let marginals: Vec<Marginal> = (0..matrix.n_examples())
        .into_par_iter()
        .map(|i| {
            let n_votes = matrix.row_nnz(i);
            let probability = if n_votes == 0 {
                prior.positive
            } else {
                posterior(row_log_odds(
                    &prior,
                    matrix.row(i).map(|(j, vote)| (thetas[mapping[j]], vote)),
                ))
            };
            Marginal {
                example_id: ids[i],
                probability,
                n_votes,
            }
        })
        .collect();

    let estimates = MarginalEstimates { marginals };
    let uncovered = estimates.uncovered();
    if uncovered > 0 {
        warn!(
            "{} of {} examples have no votes; their marginal is the class prior",
            uncovered,
            estimates.len()
        );
    }
    debug!("Computed {} marginals", estimates.len());
    estimates
}
