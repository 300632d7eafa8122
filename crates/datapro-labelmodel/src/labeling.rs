//! Labeling-function protocol and the registry that applies it.
//!
//! A labeling function looks at one candidate and votes. The registry keeps
//! functions in registration order (which becomes the source id) and applies
//! all of them to a candidate set, in parallel across candidates.
use log::info;
use rayon::prelude::*;

use crate::error::{LabelModelError, Result};
use crate::matrix::{LabelingMatrix, LabelingMatrixBuilder};
use crate::vote::Vote;

/// A pure heuristic voter over candidates of type `T`.
pub trait LabelingFunction<T>: Send + Sync {
    fn name(&self) -> &str;

    fn vote(&self, candidate: &T) -> Vote;
}

/// Adapter turning a closure into a `LabelingFunction`.
pub struct FnLabeler<F> {
    name: String,
    func: F,
}

impl<F> FnLabeler<F> {
    pub fn new(name: impl Into<String>, func: F) -> Self {
        FnLabeler {
            name: name.into(),
            func,
        }
    }
}

impl<T, F> LabelingFunction<T> for FnLabeler<F>
where
    F: Fn(&T) -> Vote + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn vote(&self, candidate: &T) -> Vote {
        (self.func)(candidate)
    }
}

/// A candidate handed to the labeling functions.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<T> {
    pub id: u64,
    pub external_ref: String,
    pub context: T,
}

impl<T> Candidate<T> {
    pub fn new(id: u64, external_ref: impl Into<String>, context: T) -> Self {
        Candidate {
            id,
            external_ref: external_ref.into(),
            context,
        }
    }
}

/// Ordered collection of labeling functions.
pub struct LabelerRegistry<T> {
    functions: Vec<Box<dyn LabelingFunction<T>>>,
}

impl<T> Default for LabelerRegistry<T> {
    fn default() -> Self {
        LabelerRegistry {
            functions: Vec::new(),
        }
    }
}

impl<T: Sync> LabelerRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.functions.iter().map(|f| f.name().to_string()).collect()
    }

    /// Append a function. Names must be unique.
    pub fn register(&mut self, function: Box<dyn LabelingFunction<T>>) -> Result<usize> {
        if self.functions.iter().any(|f| f.name() == function.name()) {
            return Err(LabelModelError::DuplicateSource(function.name().to_string()));
        }
        self.functions.push(function);
        Ok(self.functions.len() - 1)
    }

    /// Register a closure under `name`.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, func: F) -> Result<usize>
    where
        F: Fn(&T) -> Vote + Send + Sync + 'static,
        T: 'static,
    {
        self.register(Box::new(FnLabeler::new(name, func)))
    }

    /// Vote of every function on one candidate, in registration order.
    pub fn votes(&self, candidate: &T) -> Vec<Vote> {
        self.functions.iter().map(|f| f.vote(candidate)).collect()
    }

    /// Apply every function to every candidate.
    ///
    /// Candidates are labeled in parallel; rows keep the candidate order, so
    /// the matrix does not depend on scheduling.
    pub fn apply(&self, candidates: &[Candidate<T>]) -> Result<LabelingMatrix> {
        info!(
            "Applying {} labeling functions to {} candidates",
            self.len(),
            candidates.len()
        );
        let rows: Vec<Vec<Vote>> = candidates
            .par_iter()
            .map(|c| self.votes(&c.context))
            .collect();

        let mut builder = LabelingMatrixBuilder::with_sources(self.names())?;
        for (candidate, votes) in candidates.iter().zip(rows) {
            builder.add_example(candidate.id, candidate.external_ref.clone())?;
            for (j, vote) in votes.into_iter().enumerate() {
                builder.set_vote_at(candidate.id, j, vote)?;
            }
        }
        Ok(builder.build())
    }
}
