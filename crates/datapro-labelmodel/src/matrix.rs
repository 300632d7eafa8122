//! Sparse labeling matrix: rows are examples, columns are labeling sources.
//!
//! Votes are stored row-major (CSR). Abstentions are implicit, so a row only
//! holds the sources that actually voted on it. `LabelingMatrixBuilder`
//! enforces the one-vote-per-(example, source) invariant while the matrix is
//! assembled; a built `LabelingMatrix` is immutable.
use std::collections::HashMap;

use ndarray::Array2;

use crate::error::{LabelModelError, Result};
use crate::vote::Vote;

/// One item to be labeled, with a dense vote vector (one entry per source).
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub id: u64,
    /// Opaque reference back to the candidate store. Never interpreted here.
    pub external_ref: String,
    pub votes: Vec<Vote>,
}

impl Example {
    pub fn new(id: u64, external_ref: impl Into<String>, votes: Vec<Vote>) -> Self {
        Example {
            id,
            external_ref: external_ref.into(),
            votes,
        }
    }

    pub fn n_votes(&self) -> usize {
        self.votes.iter().filter(|v| !v.is_abstain()).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelingMatrix {
    example_ids: Vec<u64>,
    external_refs: Vec<String>,
    source_names: Vec<String>,
    /// `row_offsets[i]..row_offsets[i + 1]` indexes row `i` in `columns`/`votes`.
    row_offsets: Vec<usize>,
    columns: Vec<usize>,
    votes: Vec<Vote>,
}

impl LabelingMatrix {
    pub fn n_examples(&self) -> usize {
        self.example_ids.len()
    }

    pub fn n_sources(&self) -> usize {
        self.source_names.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_examples(), self.n_sources())
    }

    pub fn is_empty(&self) -> bool {
        self.n_examples() == 0 || self.n_sources() == 0
    }

    /// Number of stored (non-abstain) votes.
    pub fn nnz(&self) -> usize {
        self.votes.len()
    }

    pub fn example_ids(&self) -> &[u64] {
        &self.example_ids
    }

    pub fn external_refs(&self) -> &[String] {
        &self.external_refs
    }

    pub fn source_names(&self) -> &[String] {
        &self.source_names
    }

    pub fn source_index(&self, name: &str) -> Option<usize> {
        self.source_names.iter().position(|n| n == name)
    }

    /// Non-abstain votes of row `i` as `(source index, vote)`, ordered by source.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, Vote)> + '_ {
        let range = self.row_offsets[i]..self.row_offsets[i + 1];
        self.columns[range.clone()]
            .iter()
            .copied()
            .zip(self.votes[range].iter().copied())
    }

    pub fn row_nnz(&self, i: usize) -> usize {
        self.row_offsets[i + 1] - self.row_offsets[i]
    }

    /// Dense view of row `i`.
    pub fn example(&self, i: usize) -> Example {
        let mut votes = vec![Vote::Abstain; self.n_sources()];
        for (j, vote) in self.row(i) {
            votes[j] = vote;
        }
        Example {
            id: self.example_ids[i],
            external_ref: self.external_refs[i].clone(),
            votes,
        }
    }

    /// Rows on which every source abstained. They carry no evidence.
    pub fn uncovered_rows(&self) -> Vec<usize> {
        (0..self.n_examples())
            .filter(|&i| self.row_nnz(i) == 0)
            .collect()
    }

    /// Number of non-abstain votes cast by each source.
    pub fn column_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_sources()];
        for &j in &self.columns {
            counts[j] += 1;
        }
        counts
    }

    /// Fraction of examples source `j` voted on.
    pub fn coverage(&self, j: usize) -> f64 {
        if self.n_examples() == 0 {
            return 0.0;
        }
        let count = self.columns.iter().filter(|&&c| c == j).count();
        count as f64 / self.n_examples() as f64
    }

    /// Dense `(n_examples, n_sources)` matrix of votes in {-1, 0, 1}.
    pub fn to_dense(&self) -> Array2<i8> {
        let mut dense = Array2::zeros(self.shape());
        for i in 0..self.n_examples() {
            for (j, vote) in self.row(i) {
                dense[[i, j]] = vote.as_i8();
            }
        }
        dense
    }

    /// Build a matrix from a dense vote array. Example ids are the row indices.
    pub fn from_dense(source_names: Vec<String>, votes: &Array2<i8>) -> Result<Self> {
        if votes.ncols() != source_names.len() {
            return Err(LabelModelError::DimensionMismatch {
                expected: source_names.len(),
                found: votes.ncols(),
            });
        }
        let mut builder = LabelingMatrixBuilder::with_sources(source_names)?;
        for (i, row) in votes.outer_iter().enumerate() {
            let id = i as u64;
            builder.add_example(id, "")?;
            for (j, &value) in row.iter().enumerate() {
                builder.set_vote_at(id, j, Vote::try_from(value)?)?;
            }
        }
        Ok(builder.build())
    }

    /// Build a matrix from dense examples sharing one source layout.
    pub fn from_examples(source_names: Vec<String>, examples: Vec<Example>) -> Result<Self> {
        let mut builder = LabelingMatrixBuilder::with_sources(source_names)?;
        for example in examples {
            if example.votes.len() != builder.n_sources() {
                return Err(LabelModelError::DimensionMismatch {
                    expected: builder.n_sources(),
                    found: example.votes.len(),
                });
            }
            builder.add_example(example.id, example.external_ref)?;
            for (j, vote) in example.votes.into_iter().enumerate() {
                builder.set_vote_at(example.id, j, vote)?;
            }
        }
        Ok(builder.build())
    }

    /// Keep only the named sources, in the given order.
    pub fn select_sources<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let mut mapping = vec![None; self.n_sources()];
        for (new_idx, name) in names.iter().enumerate() {
            let old_idx = self
                .source_index(name.as_ref())
                .ok_or_else(|| LabelModelError::UnknownSource(name.as_ref().to_string()))?;
            if mapping[old_idx].is_some() {
                return Err(LabelModelError::DuplicateSource(name.as_ref().to_string()));
            }
            mapping[old_idx] = Some(new_idx);
        }

        let mut row_offsets = Vec::with_capacity(self.n_examples() + 1);
        let mut columns = Vec::new();
        let mut votes = Vec::new();
        row_offsets.push(0);
        for i in 0..self.n_examples() {
            let mut row: Vec<(usize, Vote)> = self
                .row(i)
                .filter_map(|(j, vote)| mapping[j].map(|new_j| (new_j, vote)))
                .collect();
            row.sort_unstable_by_key(|&(j, _)| j);
            for (j, vote) in row {
                columns.push(j);
                votes.push(vote);
            }
            row_offsets.push(columns.len());
        }

        Ok(LabelingMatrix {
            example_ids: self.example_ids.clone(),
            external_refs: self.external_refs.clone(),
            source_names: names.iter().map(|n| n.as_ref().to_string()).collect(),
            row_offsets,
            columns,
            votes,
        })
    }

    /// Append the columns of `other` to this matrix.
    ///
    /// Both matrices must describe the same examples in the same order and
    /// their source names must be disjoint. A model fitted on `self` does not
    /// cover the new columns; refit on the stacked matrix.
    pub fn hstack(&self, other: &LabelingMatrix) -> Result<Self> {
        if self.n_examples() != other.n_examples() {
            return Err(LabelModelError::DimensionMismatch {
                expected: self.n_examples(),
                found: other.n_examples(),
            });
        }
        if let Some((_, &id)) = self
            .example_ids
            .iter()
            .zip(other.example_ids.iter())
            .find(|(a, b)| a != b)
        {
            return Err(LabelModelError::UnknownExample(id));
        }
        if let Some(name) = other
            .source_names
            .iter()
            .find(|name| self.source_index(name).is_some())
        {
            return Err(LabelModelError::DuplicateSource(name.clone()));
        }

        let offset = self.n_sources();
        let mut row_offsets = Vec::with_capacity(self.n_examples() + 1);
        let mut columns = Vec::with_capacity(self.nnz() + other.nnz());
        let mut votes = Vec::with_capacity(self.nnz() + other.nnz());
        row_offsets.push(0);
        for i in 0..self.n_examples() {
            for (j, vote) in self.row(i) {
                columns.push(j);
                votes.push(vote);
            }
            for (j, vote) in other.row(i) {
                columns.push(j + offset);
                votes.push(vote);
            }
            row_offsets.push(columns.len());
        }

        let mut source_names = self.source_names.clone();
        source_names.extend(other.source_names.iter().cloned());

        Ok(LabelingMatrix {
            example_ids: self.example_ids.clone(),
            external_refs: self.external_refs.clone(),
            source_names,
            row_offsets,
            columns,
            votes,
        })
    }
}

/// Incremental assembly of a `LabelingMatrix` from sparse triples.
#[derive(Debug, Default, Clone)]
pub struct LabelingMatrixBuilder {
    example_ids: Vec<u64>,
    external_refs: Vec<String>,
    example_index: HashMap<u64, usize>,
    source_names: Vec<String>,
    source_index: HashMap<String, usize>,
    rows: Vec<Vec<(usize, Vote)>>,
}

impl LabelingMatrixBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Result<Self> {
        let mut builder = Self::new();
        for name in names {
            builder.add_source(name)?;
        }
        Ok(builder)
    }

    pub fn n_examples(&self) -> usize {
        self.example_ids.len()
    }

    pub fn n_sources(&self) -> usize {
        self.source_names.len()
    }

    /// Register a source column. Its id is the registration order.
    pub fn add_source(&mut self, name: impl Into<String>) -> Result<usize> {
        let name = name.into();
        if self.source_index.contains_key(&name) {
            return Err(LabelModelError::DuplicateSource(name));
        }
        let idx = self.source_names.len();
        self.source_index.insert(name.clone(), idx);
        self.source_names.push(name);
        Ok(idx)
    }

    /// Register a row. Rows keep their registration order.
    pub fn add_example(&mut self, id: u64, external_ref: impl Into<String>) -> Result<usize> {
        if self.example_index.contains_key(&id) {
            return Err(LabelModelError::DuplicateExample(id));
        }
        let idx = self.example_ids.len();
        self.example_index.insert(id, idx);
        self.example_ids.push(id);
        self.external_refs.push(external_ref.into());
        self.rows.push(Vec::new());
        Ok(idx)
    }

    /// Index of `name`, registering it on first sight.
    pub fn ensure_source(&mut self, name: &str) -> usize {
        match self.source_index.get(name) {
            Some(&idx) => idx,
            None => {
                let idx = self.source_names.len();
                self.source_index.insert(name.to_string(), idx);
                self.source_names.push(name.to_string());
                idx
            }
        }
    }

    /// Index of example `id`, registering it on first sight.
    pub fn ensure_example(&mut self, id: u64, external_ref: &str) -> usize {
        match self.example_index.get(&id) {
            Some(&idx) => idx,
            None => {
                let idx = self.example_ids.len();
                self.example_index.insert(id, idx);
                self.example_ids.push(id);
                self.external_refs.push(external_ref.to_string());
                self.rows.push(Vec::new());
                idx
            }
        }
    }

    /// Record `vote` for (example, source) by source name.
    pub fn set_vote(&mut self, example_id: u64, source: &str, vote: Vote) -> Result<()> {
        let j = *self
            .source_index
            .get(source)
            .ok_or_else(|| LabelModelError::UnknownSource(source.to_string()))?;
        self.set_vote_at(example_id, j, vote)
    }

    /// Record `vote` for (example, source) by source id.
    ///
    /// An explicit abstention counts as the pair's vote: any second vote for
    /// the same pair is rejected. Abstentions are dropped on `build`.
    pub fn set_vote_at(&mut self, example_id: u64, source_id: usize, vote: Vote) -> Result<()> {
        let i = *self
            .example_index
            .get(&example_id)
            .ok_or(LabelModelError::UnknownExample(example_id))?;
        if source_id >= self.source_names.len() {
            return Err(LabelModelError::DimensionMismatch {
                expected: self.source_names.len(),
                found: source_id + 1,
            });
        }
        let row = &mut self.rows[i];
        if row.iter().any(|&(j, _)| j == source_id) {
            return Err(LabelModelError::DuplicateVote {
                example_id,
                source: self.source_names[source_id].clone(),
            });
        }
        row.push((source_id, vote));
        Ok(())
    }

    pub fn build(self) -> LabelingMatrix {
        let nnz = self
            .rows
            .iter()
            .flatten()
            .filter(|(_, vote)| !vote.is_abstain())
            .count();
        let mut row_offsets = Vec::with_capacity(self.rows.len() + 1);
        let mut columns = Vec::with_capacity(nnz);
        let mut votes = Vec::with_capacity(nnz);
        row_offsets.push(0);
        for mut row in self.rows {
            row.retain(|(_, vote)| !vote.is_abstain());
            row.sort_unstable_by_key(|&(j, _)| j);
            for (j, vote) in row {
                columns.push(j);
                votes.push(vote);
            }
            row_offsets.push(columns.len());
        }

        LabelingMatrix {
            example_ids: self.example_ids,
            external_refs: self.external_refs,
            source_names: self.source_names,
            row_offsets,
            columns,
            votes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn small_matrix() -> LabelingMatrix {
        let dense = Array2::from_shape_vec((3, 2), vec![1, 0, 1, 1, -1, 1]).unwrap();
        LabelingMatrix::from_dense(names(&["a", "b"]), &dense).unwrap()
    }

    #[test]
    fn test_dense_round_trip_and_shape() {
        let m = small_matrix();
        assert_eq!(m.shape(), (3, 2));
        assert_eq!(m.nnz(), 5);
        assert_eq!(m.row_nnz(0), 1);
        assert_eq!(m.to_dense().row(2).to_vec(), vec![-1, 1]);
        assert_eq!(m.example(0).votes, vec![Vote::Positive, Vote::Abstain]);
        assert_eq!(m.column_counts(), vec![3, 2]);
        assert!((m.coverage(1) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_vote_rejected() {
        let mut builder = LabelingMatrixBuilder::with_sources(["a"]).unwrap();
        builder.add_example(7, "doc-7").unwrap();
        builder.set_vote(7, "a", Vote::Positive).unwrap();
        let err = builder.set_vote(7, "a", Vote::Negative).unwrap_err();
        assert_eq!(
            err,
            LabelModelError::DuplicateVote {
                example_id: 7,
                source: "a".to_string()
            }
        );
    }

    #[test]
    fn test_abstention_counts_as_a_vote_for_duplicates() {
        let mut builder = LabelingMatrixBuilder::with_sources(["a", "b"]).unwrap();
        builder.add_example(1, "").unwrap();
        builder.set_vote(1, "a", Vote::Abstain).unwrap();
        assert!(matches!(
            builder.set_vote(1, "a", Vote::Positive),
            Err(LabelModelError::DuplicateVote { example_id: 1, .. })
        ));
        builder.set_vote(1, "b", Vote::Negative).unwrap();
        assert!(matches!(
            builder.set_vote(1, "b", Vote::Abstain),
            Err(LabelModelError::DuplicateVote { example_id: 1, .. })
        ));

        let m = builder.build();
        assert_eq!(m.nnz(), 1);
        assert_eq!(m.row(0).collect::<Vec<_>>(), vec![(1, Vote::Negative)]);
    }

    #[test]
    fn test_unknown_ids_rejected() {
        let mut builder = LabelingMatrixBuilder::with_sources(["a"]).unwrap();
        builder.add_example(1, "").unwrap();
        assert_eq!(
            builder.set_vote(2, "a", Vote::Positive),
            Err(LabelModelError::UnknownExample(2))
        );
        assert_eq!(
            builder.set_vote(1, "b", Vote::Positive),
            Err(LabelModelError::UnknownSource("b".to_string()))
        );
        assert!(builder.add_source("a").is_err());
        assert!(builder.add_example(1, "").is_err());
    }

    #[test]
    fn test_uncovered_rows_flagged() {
        let dense = Array2::from_shape_vec((3, 2), vec![0, 0, 1, 0, 0, 0]).unwrap();
        let m = LabelingMatrix::from_dense(names(&["a", "b"]), &dense).unwrap();
        assert_eq!(m.uncovered_rows(), vec![0, 2]);
    }

    #[test]
    fn test_select_sources_reorders_columns() {
        let m = small_matrix();
        let swapped = m.select_sources(&["b", "a"]).unwrap();
        assert_eq!(swapped.source_names(), &names(&["b", "a"])[..]);
        assert_eq!(swapped.to_dense().row(0).to_vec(), vec![0, 1]);
        assert_eq!(swapped.to_dense().row(2).to_vec(), vec![1, -1]);
        assert!(matches!(
            m.select_sources(&["c"]),
            Err(LabelModelError::UnknownSource(_))
        ));
    }

    #[test]
    fn test_hstack_appends_columns() {
        let m = small_matrix();
        let extra_dense = Array2::from_shape_vec((3, 1), vec![0, -1, 1]).unwrap();
        let extra = LabelingMatrix::from_dense(names(&["c"]), &extra_dense).unwrap();
        let stacked = m.hstack(&extra).unwrap();
        assert_eq!(stacked.shape(), (3, 3));
        assert_eq!(stacked.to_dense().row(1).to_vec(), vec![1, 1, -1]);
        assert!(matches!(
            m.hstack(&m),
            Err(LabelModelError::DuplicateSource(_))
        ));
    }
}
