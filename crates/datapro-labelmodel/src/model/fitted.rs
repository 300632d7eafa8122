use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::config::FitConfig;
use crate::error::{LabelModelError, Result};
use crate::matrix::LabelingMatrix;
use crate::source::LabelSource;

/// Full-matrix log-likelihood at one point of the optimization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LikelihoodSample {
    pub iteration: usize,
    pub log_likelihood: f64,
}

/// Convergence and stabilization report of one fit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FitDiagnostics {
    pub final_log_likelihood: f64,
    pub iterations_run: usize,
    /// Whether the tolerance check stopped the fit before `n_iterations`.
    pub converged_early: bool,
    pub trace: Vec<LikelihoodSample>,
    /// Sources whose theta was clamped to the stability bound at least once.
    pub clipped_sources: Vec<String>,
    pub clip_events: usize,
    /// Rows of the fit matrix without a single vote.
    pub uncovered_rows: usize,
}

/// Output of one fit. Never mutated; refitting produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    sources: Vec<LabelSource>,
    class_prior: f64,
    config: FitConfig,
    diagnostics: FitDiagnostics,
    fitted_at: DateTime<Utc>,
}

impl FittedModel {
    pub(crate) fn new(
        sources: Vec<LabelSource>,
        config: FitConfig,
        diagnostics: FitDiagnostics,
    ) -> Self {
        FittedModel {
            sources,
            class_prior: config.class_prior,
            config,
            diagnostics,
            fitted_at: Utc::now(),
        }
    }

    pub fn sources(&self) -> &[LabelSource] {
        &self.sources
    }

    pub fn n_sources(&self) -> usize {
        self.sources.len()
    }

    pub fn source(&self, name: &str) -> Option<&LabelSource> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn class_prior(&self) -> f64 {
        self.class_prior
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &FitDiagnostics {
        &self.diagnostics
    }

    pub fn fitted_at(&self) -> DateTime<Utc> {
        self.fitted_at
    }

    /// `{source_name: theta}`.
    pub fn thetas(&self) -> BTreeMap<String, f64> {
        self.sources
            .iter()
            .map(|s| (s.name.clone(), s.theta))
            .collect()
    }

    /// Thetas in source-id order.
    pub fn theta_vector(&self) -> Array1<f64> {
        self.sources.iter().map(|s| s.theta).collect()
    }

    /// For each column of `matrix`, the index of the same-named model source.
    pub fn column_mapping(&self, matrix: &LabelingMatrix) -> Result<Vec<usize>> {
        matrix
            .source_names()
            .iter()
            .map(|name| {
                self.sources
                    .iter()
                    .position(|s| &s.name == name)
                    .ok_or_else(|| LabelModelError::UnknownSource(name.clone()))
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a serialized model and check that its parameters are usable.
    pub fn from_json(json: &str) -> Result<Self> {
        let model: FittedModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if !(self.class_prior > 0.0 && self.class_prior < 1.0) {
            return Err(LabelModelError::InvalidConfig(format!(
                "stored class_prior {} is outside (0, 1)",
                self.class_prior
            )));
        }
        for (idx, source) in self.sources.iter().enumerate() {
            if source.id != idx {
                return Err(LabelModelError::InvalidConfig(format!(
                    "source '{}' has id {} but is stored at position {}",
                    source.name, source.id, idx
                )));
            }
            if !source.theta.is_finite() {
                return Err(LabelModelError::Divergence {
                    source: source.name.clone(),
                    theta: source.theta,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> FittedModel {
        let mut a = LabelSource::new(0, "lf_a");
        a.theta = 1.5;
        let mut b = LabelSource::new(1, "lf_b");
        b.theta = -0.25;
        FittedModel::new(vec![a, b], FitConfig::default(), FitDiagnostics::default())
    }

    #[test]
    fn test_theta_map_and_vector() {
        let m = model();
        assert_eq!(m.thetas().get("lf_a"), Some(&1.5));
        assert_eq!(m.theta_vector().to_vec(), vec![1.5, -0.25]);
        assert_eq!(m.source("lf_b").map(|s| s.id), Some(1));
    }

    #[test]
    fn test_json_round_trip() {
        let m = model();
        let json = m.to_json().unwrap();
        assert!(json.contains("\"lf_a\""));
        let parsed = FittedModel::from_json(&json).unwrap();
        assert_eq!(parsed, m);
    }

    #[test]
    fn test_from_json_rejects_bad_prior() {
        let json = model().to_json().unwrap().replace("\"class_prior\": 0.5", "\"class_prior\": 1.5");
        assert!(matches!(
            FittedModel::from_json(&json),
            Err(LabelModelError::InvalidConfig(_))
        ));
    }
}
