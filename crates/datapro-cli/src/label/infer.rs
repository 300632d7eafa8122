//! `datapro infer`: posterior marginals from a stored run.
use std::path::Path;

use anyhow::{Context, Result};

use datapro_labelmodel::io::{read_labeling_matrix, write_marginals, write_marginals_to_path};
use datapro_labelmodel::model::{marginals, MarginalEstimates};
use datapro_labelmodel::store::{JsonFileStore, ParameterStore};

use crate::util::validate_tsv_or_csv_file;

/// Apply run `run_name` from `store_dir` to the matrix at `matrix_path`.
///
/// Marginals go to `output` when given (delimiter by extension), otherwise
/// to stdout as TSV.
pub fn run_infer(
    matrix_path: &Path,
    store_dir: &Path,
    run_name: &str,
    output: Option<&Path>,
) -> Result<MarginalEstimates> {
    validate_tsv_or_csv_file(matrix_path)?;
    let matrix = read_labeling_matrix(matrix_path)?;

    let model = JsonFileStore::new(store_dir)
        .load(run_name)
        .with_context(|| format!("Failed to load run '{}' from {}", run_name, store_dir.display()))?;
    let estimates = marginals(&model, &matrix)
        .with_context(|| format!("Failed to apply run '{}' to {}", run_name, matrix_path.display()))?;

    match output {
        Some(path) => write_marginals_to_path(&estimates, path)?,
        None => write_marginals(std::io::stdout().lock(), &estimates, b'\t')?,
    }
    Ok(estimates)
}
