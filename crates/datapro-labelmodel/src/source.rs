use serde::{Deserialize, Serialize};
use statrs::function::logistic::logistic;

/// One heuristic voter and its learned parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSource {
    /// Column index in the matrix the model was fitted on.
    pub id: usize,
    pub name: String,
    /// Log-odds of agreeing with the latent label when voting. 0 is random guessing.
    pub theta: f64,
    /// Fraction of fit examples the source voted on.
    pub propensity: f64,
}

impl LabelSource {
    pub fn new(id: usize, name: impl Into<String>) -> Self {
        LabelSource {
            id,
            name: name.into(),
            theta: 0.0,
            propensity: 0.0,
        }
    }

    /// Probability that a non-abstaining vote agrees with the true label.
    pub fn accuracy(&self) -> f64 {
        logistic(self.theta)
    }
}
