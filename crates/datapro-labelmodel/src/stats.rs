//! Per-source diagnostics of a labeling matrix.
//!
//! Coverage, overlap and conflict rates describe how the sources interact
//! without any labels. When a fitted model is supplied its learned accuracy is
//! reported next to them, and gold labels (if any) give an empirical accuracy
//! to compare against.
use serde::Serialize;

use crate::error::{LabelModelError, Result};
use crate::matrix::LabelingMatrix;
use crate::model::FittedModel;
use crate::vote::Vote;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub id: usize,
    pub name: String,
    /// Distinct non-abstain votes the source emitted.
    pub polarity: Vec<Vote>,
    /// Fraction of rows the source voted on.
    pub coverage: f64,
    /// Fraction of rows where the source and at least one other source voted.
    pub overlaps: f64,
    /// Fraction of rows where another source voted the opposite label.
    pub conflicts: f64,
    /// sigmoid(theta) of the same-named source in the model, if any.
    pub learned_accuracy: Option<f64>,
    pub correct: Option<usize>,
    pub incorrect: Option<usize>,
    pub empirical_accuracy: Option<f64>,
}

/// Summarize every source of `matrix`.
///
/// # Arguments
///
/// * `model` - Optional fitted model; sources it lacks get no learned accuracy.
/// * `gold` - Optional gold label per row (`Abstain` marks unknown rows).
pub fn summarize(
    matrix: &LabelingMatrix,
    model: Option<&FittedModel>,
    gold: Option<&[Vote]>,
) -> Result<Vec<SourceSummary>> {
    if let Some(gold) = gold {
        if gold.len() != matrix.n_examples() {
            return Err(LabelModelError::DimensionMismatch {
                expected: matrix.n_examples(),
                found: gold.len(),
            });
        }
    }

    let n_sources = matrix.n_sources();
    let mut voted = vec![0usize; n_sources];
    let mut overlapped = vec![0usize; n_sources];
    let mut conflicted = vec![0usize; n_sources];
    let mut positive = vec![false; n_sources];
    let mut negative = vec![false; n_sources];
    let mut correct = vec![0usize; n_sources];
    let mut incorrect = vec![0usize; n_sources];

    for i in 0..matrix.n_examples() {
        let row: Vec<(usize, Vote)> = matrix.row(i).collect();
        let truth = gold.map(|g| g[i]).unwrap_or(Vote::Abstain);
        for &(j, vote) in &row {
            voted[j] += 1;
            match vote {
                Vote::Positive => positive[j] = true,
                Vote::Negative => negative[j] = true,
                Vote::Abstain => {}
            }
            if row.len() > 1 {
                overlapped[j] += 1;
            }
            if row.iter().any(|&(_, other)| vote.conflicts_with(other)) {
                conflicted[j] += 1;
            }
            if !truth.is_abstain() {
                if vote == truth {
                    correct[j] += 1;
                } else {
                    incorrect[j] += 1;
                }
            }
        }
    }

    let n = matrix.n_examples().max(1) as f64;
    let summaries = matrix
        .source_names()
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let mut polarity = Vec::new();
            if negative[j] {
                polarity.push(Vote::Negative);
            }
            if positive[j] {
                polarity.push(Vote::Positive);
            }
            let labeled = correct[j] + incorrect[j];
            SourceSummary {
                id: j,
                name: name.clone(),
                polarity,
                coverage: voted[j] as f64 / n,
                overlaps: overlapped[j] as f64 / n,
                conflicts: conflicted[j] as f64 / n,
                learned_accuracy: model.and_then(|m| m.source(name)).map(|s| s.accuracy()),
                correct: gold.map(|_| correct[j]),
                incorrect: gold.map(|_| incorrect[j]),
                empirical_accuracy: match gold {
                    Some(_) if labeled > 0 => Some(correct[j] as f64 / labeled as f64),
                    _ => None,
                },
            }
        })
        .collect();

    Ok(summaries)
}

/// Log a summary table at info level.
pub fn log_source_summary(summaries: &[SourceSummary]) {
    log::info!("----- Labeling Source Summary -----");
    log::info!(
        "{:<24} {:>8} {:>8} {:>9} {:>9} {:>9}",
        "source",
        "coverage",
        "overlaps",
        "conflicts",
        "learned",
        "empirical"
    );
    let fmt_opt = |v: Option<f64>| v.map_or("-".to_string(), |x| format!("{:.3}", x));
    for s in summaries {
        log::info!(
            "{:<24} {:>8.3} {:>8.3} {:>9.3} {:>9} {:>9}",
            s.name,
            s.coverage,
            s.overlaps,
            s.conflicts,
            fmt_opt(s.learned_accuracy),
            fmt_opt(s.empirical_accuracy)
        );
    }
    log::info!("-----------------------------------");
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn matrix() -> LabelingMatrix {
        // a: + + - .   b: . + + .   c: . . . -
        let dense = Array2::from_shape_vec(
            (4, 3),
            vec![1, 0, 0, 1, 1, 0, -1, 1, 0, 0, 0, -1],
        )
        .unwrap();
        LabelingMatrix::from_dense(vec!["a".into(), "b".into(), "c".into()], &dense).unwrap()
    }

    #[test]
    fn test_coverage_overlap_conflict() {
        let s = summarize(&matrix(), None, None).unwrap();
        assert_eq!(s[0].coverage, 0.75);
        assert_eq!(s[0].overlaps, 0.5);
        assert_eq!(s[0].conflicts, 0.25);
        assert_eq!(s[0].polarity, vec![Vote::Negative, Vote::Positive]);
        assert_eq!(s[1].coverage, 0.5);
        assert_eq!(s[1].conflicts, 0.25);
        assert_eq!(s[2].overlaps, 0.0);
        assert_eq!(s[2].polarity, vec![Vote::Negative]);
        assert!(s[0].learned_accuracy.is_none());
        assert!(s[0].empirical_accuracy.is_none());
    }

    #[test]
    fn test_empirical_accuracy_against_gold() {
        let gold = vec![Vote::Positive, Vote::Positive, Vote::Positive, Vote::Abstain];
        let s = summarize(&matrix(), None, Some(gold.as_slice())).unwrap();
        assert_eq!(s[0].correct, Some(2));
        assert_eq!(s[0].incorrect, Some(1));
        assert!((s[0].empirical_accuracy.unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(s[1].empirical_accuracy, Some(1.0));
        assert_eq!(s[2].empirical_accuracy, None);
    }

    #[test]
    fn test_gold_length_checked() {
        let gold = vec![Vote::Positive];
        assert!(matches!(
            summarize(&matrix(), None, Some(gold.as_slice())),
            Err(LabelModelError::DimensionMismatch { expected: 4, found: 1 })
        ));
    }
}
