//! `datapro summary`: per-source coverage, overlap and conflict statistics.
use std::path::Path;

use anyhow::{Context, Result};

use datapro_labelmodel::io::{read_gold_labels, read_labeling_matrix};
use datapro_labelmodel::stats::{log_source_summary, summarize, SourceSummary};
use datapro_labelmodel::store::{JsonFileStore, ParameterStore};

use crate::util::validate_tsv_or_csv_file;

/// Summarize the sources of the matrix at `matrix_path`.
///
/// With `store_dir` and `run_name` the learned accuracies of that run are
/// included; with `gold_path` the empirical accuracies are too. The table
/// is logged and the summaries are returned for printing.
pub fn run_summary(
    matrix_path: &Path,
    run: Option<(&Path, &str)>,
    gold_path: Option<&Path>,
) -> Result<Vec<SourceSummary>> {
    validate_tsv_or_csv_file(matrix_path)?;
    let matrix = read_labeling_matrix(matrix_path)?;

    let model = match run {
        Some((store_dir, run_name)) => Some(
            JsonFileStore::new(store_dir)
                .load(run_name)
                .with_context(|| format!("Failed to load run '{}'", run_name))?,
        ),
        None => None,
    };

    let gold = match gold_path {
        Some(path) => {
            validate_tsv_or_csv_file(path)?;
            Some(read_gold_labels(path, &matrix)?)
        }
        None => None,
    };

    let summaries = summarize(&matrix, model.as_deref(), gold.as_deref())?;
    log_source_summary(&summaries);
    Ok(summaries)
}
