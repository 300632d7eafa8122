//! Reliability estimation by gradient ascent on the marginal log-likelihood.
//!
//! The latent label of every example is summed out exactly (two hypotheses),
//! so no ground truth is needed. For a source j the gradient of the log
//! marginal likelihood is
//!
//! ```text
//! d/d theta_j = sum_i [ P(y_i = v_ij | votes_i) - sigmoid(theta_j) ]
//! ```
//!
//! over the rows where j did not abstain: a source is pushed up when the
//! posterior agrees with it more often than its current accuracy predicts.
use log::{debug, info, warn};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use statrs::function::logistic::{logistic, logit};

use crate::config::{DivergencePolicy, FitConfig};
use crate::error::{LabelModelError, Result};
use crate::matrix::LabelingMatrix;
use crate::model::fitted::{FitDiagnostics, FittedModel, LikelihoodSample};
use crate::model::likelihood::{agreement, row_log_marginal, row_log_odds, ClassPrior};
use crate::source::LabelSource;

/// Fit a label model to `matrix`.
///
/// # Arguments
///
/// * `matrix` - Votes of every source on every example. Needs at least one
///   example and one source.
/// * `config` - Optimization hyper-parameters; validated before fitting.
///
/// # Returns
///
/// A new `FittedModel`. Any clamping of thetas to `config.theta_bound` is
/// listed in its diagnostics. With `DivergencePolicy::Fail` the first source
/// to leave the bound aborts the fit with `LabelModelError::Divergence`.
pub fn fit(matrix: &LabelingMatrix, config: &FitConfig) -> Result<FittedModel> {
    config.validate()?;
    if matrix.is_empty() {
        return Err(LabelModelError::EmptyMatrix);
    }

    let (n_examples, n_sources) = matrix.shape();
    let uncovered = matrix.uncovered_rows().len();
    if uncovered > 0 {
        warn!(
            "{} of {} examples have no votes and contribute no evidence",
            uncovered, n_examples
        );
    }
    info!(
        "Fitting label model on {} examples x {} sources ({} votes)",
        n_examples,
        n_sources,
        matrix.nnz()
    );

    let prior = ClassPrior::new(config.class_prior);
    let mut thetas = Array1::from_elem(n_sources, logit(config.init_reliability));

    // Rows without votes have a zero gradient; skip them when batching.
    let mut rows: Vec<usize> = (0..n_examples).filter(|&i| matrix.row_nnz(i) > 0).collect();
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut clipped = vec![false; n_sources];
    let mut clip_events = 0usize;
    let mut last_ll = log_likelihood(matrix, &thetas, &prior);
    let mut trace = vec![LikelihoodSample {
        iteration: 0,
        log_likelihood: last_ll,
    }];
    let mut step = config.learning_rate;
    let mut iterations_run = 0usize;
    let mut converged_early = false;

    for iter in 0..config.n_iterations {
        let batch: &[usize] = match config.batch_size {
            Some(size) if size < rows.len() => rows.partial_shuffle(&mut rng, size).0,
            _ => &rows,
        };

        let mut grad = gradient(matrix, &thetas, &prior, batch);
        if config.l2_penalty > 0.0 {
            grad.scaled_add(-config.l2_penalty, &thetas);
        }
        thetas.scaled_add(step, &grad);

        for (j, theta) in thetas.iter_mut().enumerate() {
            if !theta.is_finite() {
                return Err(LabelModelError::Divergence {
                    source: matrix.source_names()[j].clone(),
                    theta: *theta,
                });
            }
            if theta.abs() > config.theta_bound {
                match config.divergence_policy {
                    DivergencePolicy::Fail => {
                        return Err(LabelModelError::Divergence {
                            source: matrix.source_names()[j].clone(),
                            theta: *theta,
                        });
                    }
                    DivergencePolicy::Clip => {
                        *theta = theta.clamp(-config.theta_bound, config.theta_bound);
                        clipped[j] = true;
                        clip_events += 1;
                    }
                }
            }
        }

        step *= config.step_decay;
        iterations_run = iter + 1;

        if iterations_run % config.log_every == 0 || iterations_run == config.n_iterations {
            let ll = log_likelihood(matrix, &thetas, &prior);
            if !ll.is_finite() {
                // Blame the most extreme source.
                let (j, theta) = thetas
                    .iter()
                    .enumerate()
                    .fold((0, 0.0_f64), |best, (j, &t)| {
                        if t.abs() > best.1.abs() {
                            (j, t)
                        } else {
                            best
                        }
                    });
                return Err(LabelModelError::Divergence {
                    source: matrix.source_names()[j].clone(),
                    theta,
                });
            }
            trace.push(LikelihoodSample {
                iteration: iterations_run,
                log_likelihood: ll,
            });
            debug!("Iteration {}: log-likelihood {:.6}", iterations_run, ll);

            let delta = (ll - last_ll).abs();
            last_ll = ll;
            if config.tolerance > 0.0 && delta < config.tolerance {
                converged_early = iterations_run < config.n_iterations;
                break;
            }
        }
    }

    let clipped_sources: Vec<String> = matrix
        .source_names()
        .iter()
        .zip(clipped.iter())
        .filter(|(_, was_clipped)| **was_clipped)
        .map(|(name, _)| name.clone())
        .collect();
    if !clipped_sources.is_empty() {
        warn!(
            "Clipped {} source(s) to |theta| <= {} ({} events): {:?}",
            clipped_sources.len(),
            config.theta_bound,
            clip_events,
            clipped_sources
        );
    }

    let counts = matrix.column_counts();
    let sources = matrix
        .source_names()
        .iter()
        .enumerate()
        .map(|(j, name)| LabelSource {
            id: j,
            name: name.clone(),
            theta: thetas[j],
            propensity: counts[j] as f64 / n_examples as f64,
        })
        .collect();

    info!(
        "Finished after {} iterations: log-likelihood {:.6}",
        iterations_run, last_ll
    );

    Ok(FittedModel::new(
        sources,
        config.clone(),
        FitDiagnostics {
            final_log_likelihood: last_ll,
            iterations_run,
            converged_early,
            trace,
            clipped_sources,
            clip_events,
            uncovered_rows: uncovered,
        },
    ))
}

/// Gradient of the summed log marginal likelihood over `rows`.
fn gradient(
    matrix: &LabelingMatrix,
    thetas: &Array1<f64>,
    prior: &ClassPrior,
    rows: &[usize],
) -> Array1<f64> {
    let accuracies = thetas.mapv(logistic);
    let mut grad = Array1::zeros(thetas.len());
    for &i in rows {
        let log_odds = row_log_odds(prior, matrix.row(i).map(|(j, vote)| (thetas[j], vote)));
        for (j, vote) in matrix.row(i) {
            grad[j] += agreement(log_odds, vote) - accuracies[j];
        }
    }
    grad
}

/// Log marginal likelihood of the whole matrix.
pub fn log_likelihood(matrix: &LabelingMatrix, thetas: &Array1<f64>, prior: &ClassPrior) -> f64 {
    (0..matrix.n_examples())
        .map(|i| row_log_marginal(prior, matrix.row(i).map(|(j, vote)| (thetas[j], vote))))
        .sum()
}
