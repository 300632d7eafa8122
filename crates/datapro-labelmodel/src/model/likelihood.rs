//! Log-space probability model shared by fitting and inference.
//!
//! Given the latent label y and a non-abstaining vote v from a source with
//! reliability theta, P(v | y) = sigmoid(theta * v * y). Abstentions add no
//! term. Everything is accumulated as log-probabilities so that matrices with
//! many sources do not underflow.
use statrs::function::logistic::{logistic, logit};

use crate::vote::Vote;

/// Log prior of both hypotheses.
#[derive(Debug, Clone, Copy)]
pub struct ClassPrior {
    pub positive: f64,
    pub log_positive: f64,
    pub log_negative: f64,
    pub log_odds: f64,
}

impl ClassPrior {
    /// `positive` must lie in (0, 1).
    pub fn new(positive: f64) -> Self {
        ClassPrior {
            positive,
            log_positive: positive.ln(),
            log_negative: (1.0 - positive).ln(),
            log_odds: logit(positive),
        }
    }
}

/// `ln(sigmoid(x))` without overflow for large |x|.
#[inline]
pub fn log_sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        -(-x).exp().ln_1p()
    } else {
        x - x.exp().ln_1p()
    }
}

/// `ln(exp(a) + exp(b))`.
#[inline]
pub fn log_sum_exp2(a: f64, b: f64) -> f64 {
    let m = a.max(b);
    if m == f64::NEG_INFINITY {
        return m;
    }
    m + ((a - m).exp() + (b - m).exp()).ln()
}

/// Posterior log-odds of y = +1 for one row of `(theta, vote)` pairs.
///
/// `ln sigmoid(t) - ln sigmoid(-t) = t`, so the two hypotheses differ by the
/// signed sum of the voters' thetas.
#[inline]
pub fn row_log_odds(prior: &ClassPrior, votes: impl Iterator<Item = (f64, Vote)>) -> f64 {
    prior.log_odds + votes.map(|(theta, vote)| theta * vote.sign()).sum::<f64>()
}

/// Log marginal likelihood of one row with y summed out.
pub fn row_log_marginal(prior: &ClassPrior, votes: impl Iterator<Item = (f64, Vote)>) -> f64 {
    let mut log_pos = prior.log_positive;
    let mut log_neg = prior.log_negative;
    for (theta, vote) in votes {
        let signed = theta * vote.sign();
        log_pos += log_sigmoid(signed);
        log_neg += log_sigmoid(-signed);
    }
    log_sum_exp2(log_pos, log_neg)
}

/// P(y = +1) from posterior log-odds, kept strictly inside (0, 1).
///
/// The logistic alone rounds to exactly 1.0 once the log-odds pass ~37.
#[inline]
pub fn posterior(log_odds: f64) -> f64 {
    logistic(log_odds).clamp(POSTERIOR_FLOOR, 1.0 - POSTERIOR_FLOOR)
}

pub const POSTERIOR_FLOOR: f64 = f64::EPSILON;

/// P(y equals `vote`) from posterior log-odds. `vote` must not abstain.
#[inline]
pub fn agreement(log_odds: f64, vote: Vote) -> f64 {
    logistic(vote.sign() * log_odds)
}
