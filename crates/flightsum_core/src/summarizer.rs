//! Per-batch summarizers.
//!
//! Both variants accumulate raw degree sums per term, but they differ in
//! when normalization happens:
//! - [`MeanSummarizer`] divides by the *global* record count before handing
//!   its partial over, so partials are summed as-is by the reducer.
//! - [`SatisfactionSummarizer`] hands over raw sums and its satisfying count;
//!   the reducer divides once, by the pooled count.

use crate::vocabulary::RewrittenRecord;
use std::collections::HashMap;

/// Contract shared by both summarizer variants. One instance per batch.
pub trait BatchSummarizer: Send {
    /// What this summarizer hands to the reducer.
    type Partial: Send;

    fn add_record(&mut self, record: &RewrittenRecord);

    /// Consumes the summarizer; the partial is immutable from here on.
    fn into_partial(self) -> Self::Partial;

    /// Human-readable name for logging/debugging
    fn name(&self) -> &'static str;
}

fn accumulate(sums: &mut HashMap<String, f64>, record: &RewrittenRecord) {
    for (term, degree) in record.iter() {
        match sums.get_mut(term) {
            Some(sum) => *sum += degree,
            None => {
                sums.insert(term.to_string(), degree);
            }
        }
    }
}

/// Partial means, already divided by the global record count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeanPartial {
    pub degrees: HashMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct MeanSummarizer {
    nb_records: usize,
    sums: HashMap<String, f64>,
}

impl MeanSummarizer {
    /// `nb_records` is the record count of the whole dataset, not of the batch.
    pub fn new(nb_records: usize) -> Self {
        Self {
            nb_records,
            sums: HashMap::new(),
        }
    }
}

impl BatchSummarizer for MeanSummarizer {
    type Partial = MeanPartial;

    fn add_record(&mut self, record: &RewrittenRecord) {
        accumulate(&mut self.sums, record);
    }

    fn into_partial(self) -> MeanPartial {
        if self.nb_records == 0 {
            return MeanPartial::default();
        }
        let total = self.nb_records as f64;
        let degrees = self
            .sums
            .into_iter()
            .map(|(term, sum)| (term, sum / total))
            .collect();
        MeanPartial { degrees }
    }

    fn name(&self) -> &'static str {
        "Mean"
    }
}

/// Un-normalized sums over the records satisfying the premise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SatisfactionPartial {
    pub sums: HashMap<String, f64>,
    pub satisfying_count: usize,
}

#[derive(Debug, Clone)]
pub struct SatisfactionSummarizer<'p> {
    premise: &'p [String],
    sums: HashMap<String, f64>,
    satisfying_count: usize,
}

impl<'p> SatisfactionSummarizer<'p> {
    pub fn new(premise: &'p [String]) -> Self {
        Self {
            premise,
            sums: HashMap::new(),
            satisfying_count: 0,
        }
    }

    /// A record satisfies the premise when every premise term has degree exactly 1.
    pub fn satisfies(&self, record: &RewrittenRecord) -> bool {
        self.premise.iter().all(|term| record.degree(term) == 1.0)
    }
}

impl BatchSummarizer for SatisfactionSummarizer<'_> {
    type Partial = SatisfactionPartial;

    fn add_record(&mut self, record: &RewrittenRecord) {
        if self.satisfies(record) {
            self.satisfying_count += 1;
            accumulate(&mut self.sums, record);
        }
    }

    fn into_partial(self) -> SatisfactionPartial {
        SatisfactionPartial {
            sums: self.sums,
            satisfying_count: self.satisfying_count,
        }
    }

    fn name(&self) -> &'static str {
        "Satisfaction"
    }
}
