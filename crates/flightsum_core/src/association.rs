//! Gradual association mining between linguistic terms.
//!
//! Given the unconditional summary R and a conditional summary R_v, the
//! dependency of a term set is its conditional coverage over its baseline
//! coverage, and the association degree maps dependency onto [0, 1).

use crate::summary::{AssociationTable, Summary};
use tracing::info;

/// Coverage of `terms` in `summary`.
///
/// When the exact number of summarized records `n` is known it is
/// authoritative and returned as-is. Otherwise coverage is the mean degree
/// of `terms` in `summary`, missing terms counting as 0 and an empty term
/// set covering nothing.
///
/// The averaging path divides by the number of requested terms, not by the
/// summary's key count; the two agree only when `terms` spans the whole
/// summary.
pub fn coverage(terms: &[&str], summary: &Summary, n: Option<usize>) -> f64 {
    if let Some(n) = n {
        return n as f64;
    }
    if terms.is_empty() {
        return 0.0;
    }
    let total: f64 = terms.iter().map(|term| summary.degree(term)).sum();
    total / terms.len() as f64
}

/// Conditional coverage over baseline coverage, 0 when the baseline is 0.
pub fn dependency(terms: &[&str], r: &Summary, rv: &Summary, n: Option<usize>) -> f64 {
    let baseline = coverage(terms, r, None);
    if baseline == 0.0 {
        return 0.0;
    }
    coverage(terms, rv, n) / baseline
}

/// `1 - 1/dep` for a dependency above 1, else 0.
pub fn association_degree(dependency: f64) -> f64 {
    if dependency <= 1.0 {
        0.0
    } else {
        1.0 - 1.0 / dependency
    }
}

pub fn association(terms: &[&str], r: &Summary, rv: &Summary, n: Option<usize>) -> f64 {
    association_degree(dependency(terms, r, rv, n))
}

/// Terms of R_v whose degree reaches `threshold`, i.e. practically certain under the premise.
pub fn extract_terms(rv: &Summary, threshold: f64) -> Vec<String> {
    rv.iter()
        .filter(|(_, degree)| *degree >= threshold)
        .map(|(term, _)| term.to_string())
        .collect()
}

/// Computes the association degree of every term of R against R_v.
#[derive(Debug, Clone)]
pub struct AssociationMiner<'a> {
    r: &'a Summary,
    rv: &'a Summary,
    n: Option<usize>,
    certainty_threshold: f64,
}

impl<'a> AssociationMiner<'a> {
    /// `n` is the exact number of records summarized into R_v, when known.
    pub fn new(r: &'a Summary, rv: &'a Summary, n: Option<usize>, certainty_threshold: f64) -> Self {
        Self {
            r,
            rv,
            n,
            certainty_threshold,
        }
    }

    pub fn mine(&self) -> AssociationTable {
        let premise = extract_terms(self.rv, self.certainty_threshold);
        info!(terms = ?premise, n = ?self.n, "Extracted premise candidates");

        let degrees = self
            .r
            .terms()
            .map(|term| {
                let degree = association(&[term], self.r, self.rv, self.n);
                (term.to_string(), degree)
            })
            .collect();

        AssociationTable { premise, degrees }
    }
}
