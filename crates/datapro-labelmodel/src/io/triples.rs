//! Sparse `(example_id, source, vote)` triple files.
//!
//! Examples and sources are ordered by first appearance. A `0` vote stores
//! nothing but still registers its example and source, and counts as that
//! pair's one vote. The writer spells out the first example over every
//! source, so column order and silent sources survive a round trip.
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::io::{delimiter_for, find_column};
use crate::matrix::{LabelingMatrix, LabelingMatrixBuilder};
use crate::vote::Vote;

/// Read a labeling matrix from a triple file with header
/// `example_id, source, vote[, external_ref]`.
pub fn read_labeling_matrix<P: AsRef<Path>>(path: P) -> Result<LabelingMatrix> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open labeling matrix: {}", path.display()))?;

    let headers = reader
        .headers()
        .context("Failed to read labeling matrix header row")?
        .clone();
    let id_idx = find_column(&headers, &["example_id", "id"])
        .ok_or_else(|| anyhow!("Missing 'example_id' column in {}", path.display()))?;
    let source_idx = find_column(&headers, &["source", "source_name", "lf"])
        .ok_or_else(|| anyhow!("Missing 'source' column in {}", path.display()))?;
    let vote_idx = find_column(&headers, &["vote", "label"])
        .ok_or_else(|| anyhow!("Missing 'vote' column in {}", path.display()))?;
    let ref_idx = find_column(&headers, &["external_ref", "ref"]);

    let mut builder = LabelingMatrixBuilder::new();
    for (row_idx, result) in reader.records().enumerate() {
        let line = row_idx + 2;
        let record = result.with_context(|| format!("Failed to read line {}", line))?;

        let example_id = record
            .get(id_idx)
            .ok_or_else(|| anyhow!("Missing example_id at line {}", line))?
            .trim()
            .parse::<u64>()
            .with_context(|| format!("Invalid example_id at line {}", line))?;
        let source = record
            .get(source_idx)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("Missing source at line {}", line))?;
        let raw_vote = record
            .get(vote_idx)
            .ok_or_else(|| anyhow!("Missing vote at line {}", line))?
            .trim()
            .parse::<i64>()
            .with_context(|| format!("Invalid vote at line {}", line))?;
        let vote = Vote::try_from(raw_vote).with_context(|| format!("Line {}", line))?;
        let external_ref = ref_idx
            .and_then(|idx| record.get(idx))
            .unwrap_or_default()
            .trim();

        builder.ensure_example(example_id, external_ref);
        let j = builder.ensure_source(source);
        builder
            .set_vote_at(example_id, j, vote)
            .with_context(|| format!("Line {}", line))?;
    }

    let matrix = builder.build();
    log::info!(
        "Loaded labeling matrix from {}: {} examples x {} sources, {} votes",
        path.display(),
        matrix.n_examples(),
        matrix.n_sources(),
        matrix.nnz()
    );
    Ok(matrix)
}

/// Write `matrix` as triples readable by [`read_labeling_matrix`].
pub fn write_labeling_matrix<P: AsRef<Path>>(matrix: &LabelingMatrix, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter_for(path))
        .from_path(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;

    writer.write_record(["example_id", "source", "vote", "external_ref"])?;

    let names = matrix.source_names();
    for i in 0..matrix.n_examples() {
        let id = matrix.example_ids()[i].to_string();
        let external_ref = &matrix.external_refs()[i];
        if i == 0 && !names.is_empty() {
            // Dense first row registers every source in column order.
            for (j, vote) in matrix.example(0).votes.iter().enumerate() {
                let vote = vote.to_string();
                writer.write_record([id.as_str(), names[j].as_str(), vote.as_str(), external_ref.as_str()])?;
            }
            continue;
        }
        let mut wrote_row = false;
        for (j, vote) in matrix.row(i) {
            wrote_row = true;
            let vote = vote.to_string();
            writer.write_record([id.as_str(), names[j].as_str(), vote.as_str(), external_ref.as_str()])?;
        }
        if !wrote_row && !names.is_empty() {
            // Keep the empty row and its position.
            writer.write_record([id.as_str(), names[0].as_str(), "0", external_ref.as_str()])?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Read gold labels (`example_id, label`) aligned to the rows of `matrix`.
///
/// Rows without a gold entry get `Vote::Abstain`; ids that are not rows of
/// the matrix are skipped with a warning.
pub fn read_gold_labels<P: AsRef<Path>>(path: P, matrix: &LabelingMatrix) -> Result<Vec<Vote>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open gold labels: {}", path.display()))?;

    let headers = reader.headers().context("Failed to read gold header row")?.clone();
    let id_idx = find_column(&headers, &["example_id", "id"])
        .ok_or_else(|| anyhow!("Missing 'example_id' column in {}", path.display()))?;
    let label_idx = find_column(&headers, &["label", "gold", "vote"])
        .ok_or_else(|| anyhow!("Missing 'label' column in {}", path.display()))?;

    let row_of: std::collections::HashMap<u64, usize> = matrix
        .example_ids()
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();

    let mut gold = vec![Vote::Abstain; matrix.n_examples()];
    let mut skipped = 0usize;
    for (row_idx, result) in reader.records().enumerate() {
        let line = row_idx + 2;
        let record = result.with_context(|| format!("Failed to read line {}", line))?;
        let id = record
            .get(id_idx)
            .unwrap_or_default()
            .trim()
            .parse::<u64>()
            .with_context(|| format!("Invalid example_id at line {}", line))?;
        let label = record
            .get(label_idx)
            .unwrap_or_default()
            .trim()
            .parse::<i64>()
            .with_context(|| format!("Invalid label at line {}", line))?;
        let label = Vote::try_from(label).with_context(|| format!("Line {}", line))?;
        match row_of.get(&id) {
            Some(&i) => gold[i] = label,
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        log::warn!(
            "Skipped {} gold labels for examples not in the labeling matrix",
            skipped
        );
    }
    Ok(gold)
}
