//! TSV/CSV readers and writers for labeling matrices, gold labels and
//! marginals. The delimiter follows the file extension (`.tsv` is tab
//! separated, anything else comma separated).

pub mod marginals;
pub mod triples;

use std::path::Path;

pub use marginals::{write_marginals, write_marginals_to_path};
pub use triples::{read_gold_labels, read_labeling_matrix, write_labeling_matrix};

pub(crate) fn delimiter_for(path: &Path) -> u8 {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("tsv") => b'\t',
        _ => b',',
    }
}

pub(crate) fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(name))
    })
}
