use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::LabelModelError;

/// What to do when a reliability parameter reaches the stability bound.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DivergencePolicy {
    /// Clamp theta to the bound and record the event in the fit diagnostics.
    #[default]
    Clip,
    /// Abort the fit with `LabelModelError::Divergence`.
    Fail,
}

impl FromStr for DivergencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clip" => Ok(DivergencePolicy::Clip),
            "fail" => Ok(DivergencePolicy::Fail),
            _ => Err(format!(
                "Unknown divergence policy: {}. Valid options are: clip, fail",
                s
            )),
        }
    }
}

/// Hyper-parameters of one label-model fit.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FitConfig {
    /// Hard cap on gradient steps.
    pub n_iterations: usize,
    /// Step size applied to the gradient summed over the batch.
    pub learning_rate: f64,
    /// P(y = +1).
    pub class_prior: f64,
    /// Rows per minibatch. `None` runs full-batch gradient ascent.
    pub batch_size: Option<usize>,
    /// Seed for minibatch sampling.
    pub seed: u64,
    /// L2 penalty pulling every theta toward the neutral value 0.
    pub l2_penalty: f64,
    /// Multiplicative step decay per iteration, in (0, 1].
    pub step_decay: f64,
    /// Every source starts at theta = logit(init_reliability).
    pub init_reliability: f64,
    /// Thetas are kept within [-theta_bound, theta_bound].
    pub theta_bound: f64,
    pub divergence_policy: DivergencePolicy,
    /// Stop early once the log-likelihood moves less than this between
    /// evaluations. Zero disables early stopping.
    pub tolerance: f64,
    /// Evaluate (and trace) the full log-likelihood every `log_every` steps.
    pub log_every: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            n_iterations: 3000,
            learning_rate: 1e-5,
            class_prior: 0.5,
            batch_size: None,
            seed: 0,
            l2_penalty: 0.0,
            step_decay: 1.0,
            init_reliability: 0.7,
            theta_bound: 8.0,
            divergence_policy: DivergencePolicy::Clip,
            tolerance: 0.0,
            log_every: 100,
        }
    }
}

impl FitConfig {
    pub fn new(n_iterations: usize, learning_rate: f64) -> Self {
        Self {
            n_iterations,
            learning_rate,
            ..Default::default()
        }
    }

    pub fn with_class_prior(mut self, class_prior: f64) -> Self {
        self.class_prior = class_prior;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize, seed: u64) -> Self {
        self.batch_size = Some(batch_size);
        self.seed = seed;
        self
    }

    pub fn with_divergence_policy(mut self, policy: DivergencePolicy) -> Self {
        self.divergence_policy = policy;
        self
    }

    /// Check every hyper-parameter against its admissible range.
    pub fn validate(&self) -> Result<(), LabelModelError> {
        let invalid = |msg: String| Err(LabelModelError::InvalidConfig(msg));

        if self.n_iterations == 0 {
            return invalid("n_iterations must be positive".to_string());
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return invalid(format!("learning_rate must be positive, got {}", self.learning_rate));
        }
        if !(self.class_prior > 0.0 && self.class_prior < 1.0) {
            return invalid(format!("class_prior must lie in (0, 1), got {}", self.class_prior));
        }
        if self.batch_size == Some(0) {
            return invalid("batch_size must be positive when set".to_string());
        }
        if !(self.l2_penalty.is_finite() && self.l2_penalty >= 0.0) {
            return invalid(format!("l2_penalty must be non-negative, got {}", self.l2_penalty));
        }
        if !(self.step_decay > 0.0 && self.step_decay <= 1.0) {
            return invalid(format!("step_decay must lie in (0, 1], got {}", self.step_decay));
        }
        if !(self.init_reliability > 0.0 && self.init_reliability < 1.0) {
            return invalid(format!(
                "init_reliability must lie in (0, 1), got {}",
                self.init_reliability
            ));
        }
        if !(self.theta_bound.is_finite() && self.theta_bound > 0.0) {
            return invalid(format!("theta_bound must be positive, got {}", self.theta_bound));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return invalid(format!("tolerance must be non-negative, got {}", self.tolerance));
        }
        if self.log_every == 0 {
            return invalid("log_every must be positive".to_string());
        }
        Ok(())
    }
}
