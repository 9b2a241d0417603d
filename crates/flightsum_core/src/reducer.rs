//! Reduction of per-batch partials into one global summary.
//!
//! Two strategies exist and must stay distinct:
//!
//! - [`reduce_mean`] (pre-normalized sum): mean partials were already divided
//!   by the global record count, so the global mean is their plain sum.
//! - [`reduce_satisfaction`] (pooled satisfaction): satisfaction partials
//!   carry raw sums; they are pooled first and divided once by the total
//!   satisfying count. Dividing per batch would bias the mean whenever batch
//!   counts differ.
//!
//! Both clamp pooled degrees into [0, 1]: summing many pre-divided partials
//! can drift a few ulps past 1.

use crate::summarizer::{MeanPartial, SatisfactionPartial};
use crate::summary::{ConditionalSummary, Summary};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Sums degrees term-wise; terms missing from a partial contribute 0.
fn pool<'a, I>(partials: I) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = &'a HashMap<String, f64>>,
{
    let mut pooled = BTreeMap::new();
    for partial in partials {
        for (term, value) in partial {
            *pooled.entry(term.clone()).or_insert(0.0) += value;
        }
    }
    pooled
}

/// Global mean summary R from pre-normalized partials.
pub fn reduce_mean(partials: &[MeanPartial]) -> Summary {
    let mut pooled = pool(partials.iter().map(|p| &p.degrees));
    pooled
        .values_mut()
        .for_each(|degree| *degree = degree.clamp(0.0, 1.0));
    debug!(
        strategy = "PreNormalizedSum",
        partials = partials.len(),
        terms = pooled.len(),
        "Reduced partial summaries"
    );
    Summary::from_degrees(pooled)
}

/// Conditional summary R_v from raw satisfaction partials.
///
/// With no satisfying record at all every degree is 0, then alpha filtering
/// applies as usual (so any `alpha >= 0` empties the summary).
pub fn reduce_satisfaction(
    partials: &[SatisfactionPartial],
    premise: &[String],
    alpha: f64,
) -> ConditionalSummary {
    let total_satisfying_count: usize = partials.iter().map(|p| p.satisfying_count).sum();
    let mut pooled = pool(partials.iter().map(|p| &p.sums));

    if total_satisfying_count == 0 {
        pooled.values_mut().for_each(|degree| *degree = 0.0);
    } else {
        let total = total_satisfying_count as f64;
        pooled
            .values_mut()
            .for_each(|degree| *degree = (*degree / total).clamp(0.0, 1.0));
    }

    let mut summary = Summary::from_degrees(pooled);
    summary.retain_above(alpha);
    debug!(
        strategy = "PooledSatisfaction",
        alpha,
        partials = partials.len(),
        total_satisfying_count,
        kept_terms = summary.len(),
        "Reduced partial summaries"
    );

    ConditionalSummary {
        summary,
        premise: premise.to_vec(),
        total_satisfying_count,
    }
}
