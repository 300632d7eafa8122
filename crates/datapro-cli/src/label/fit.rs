//! `datapro fit`: learn source reliabilities and store them under a run name.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use datapro_labelmodel::config::{DivergencePolicy, FitConfig};
use datapro_labelmodel::io::read_labeling_matrix;
use datapro_labelmodel::model::{fit, FittedModel};
use datapro_labelmodel::stats::{log_source_summary, summarize};
use datapro_labelmodel::store::{JsonFileStore, ParameterStore};

use crate::util::validate_tsv_or_csv_file;

/// Parameters of one `fit` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitCommandConfig {
    pub version: String,
    pub run_name: String,
    pub store_dir: PathBuf,
    pub fit: FitConfig,
}

impl Default for FitCommandConfig {
    fn default() -> Self {
        Self {
            version: clap::crate_version!().to_string(),
            run_name: String::from("default"),
            store_dir: PathBuf::from("datapro_models"),
            fit: FitConfig::default(),
        }
    }
}

impl FitCommandConfig {
    /// Start from the config file (or defaults) and apply command-line overrides.
    pub fn from_arguments(config_path: Option<&PathBuf>, matches: &ArgMatches) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => load_fit_config(path)?,
            None => FitCommandConfig::default(),
        };

        if let Some(run_name) = matches.get_one::<String>("run_name") {
            config.run_name = run_name.clone();
        }
        if let Some(store_dir) = matches.get_one::<PathBuf>("store") {
            config.store_dir = store_dir.clone();
        }
        if let Some(n_iterations) = matches.get_one::<usize>("iterations") {
            config.fit.n_iterations = *n_iterations;
        }
        if let Some(learning_rate) = matches.get_one::<f64>("learning_rate") {
            config.fit.learning_rate = *learning_rate;
        }
        if let Some(prior) = matches.get_one::<f64>("prior") {
            config.fit.class_prior = *prior;
        }
        if let Some(batch_size) = matches.get_one::<usize>("batch_size") {
            config.fit.batch_size = Some(*batch_size);
        }
        if let Some(seed) = matches.get_one::<u64>("seed") {
            config.fit.seed = *seed;
        }
        if let Some(policy) = matches.get_one::<String>("divergence_policy") {
            config.fit.divergence_policy =
                policy.parse::<DivergencePolicy>().map_err(anyhow::Error::msg)?;
        }

        config.fit.validate()?;
        Ok(config)
    }
}

/// Load a fit configuration from a JSON file. Missing fields take defaults.
pub fn load_fit_config<P: AsRef<Path>>(path: P) -> Result<FitCommandConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: FitCommandConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

/// Fit a label model to the triple file at `matrix_path` and save it in the
/// configured store.
pub fn run_fit<P: AsRef<Path>>(matrix_path: P, config: &FitCommandConfig) -> Result<Arc<FittedModel>> {
    let matrix_path = matrix_path.as_ref();
    validate_tsv_or_csv_file(matrix_path)?;
    let matrix = read_labeling_matrix(matrix_path)?;

    let start = Instant::now();
    let model = fit(&matrix, &config.fit)
        .with_context(|| format!("Failed to fit label model on {}", matrix_path.display()))?;
    log::info!(
        "Fit {} sources in {:.2?} (final log-likelihood {:.4})",
        model.n_sources(),
        start.elapsed(),
        model.diagnostics().final_log_likelihood
    );

    log_source_summary(&summarize(&matrix, Some(&model), None)?);

    let store = JsonFileStore::new(&config.store_dir);
    let saved = store
        .save(&config.run_name, model)
        .with_context(|| format!("Failed to save run '{}'", config.run_name))?;
    Ok(saved)
}
