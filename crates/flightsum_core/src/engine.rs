//! Summarization engine: partition, fan out, reduce.

use crate::association::AssociationMiner;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::executor::run_batches;
use crate::partition::make_batches;
use crate::reducer::{reduce_mean, reduce_satisfaction};
use crate::summarizer::{MeanSummarizer, SatisfactionSummarizer};
use crate::summary::{AssociationTable, ConditionalSummary, Summary};
use crate::vocabulary::Rewriter;
use csv::StringRecord;
use std::time::Instant;
use tracing::info;

pub struct SummaryEngine<'a, R: Rewriter + ?Sized> {
    rewriter: &'a R,
    config: EngineConfig,
}

impl<'a, R: Rewriter + ?Sized> SummaryEngine<'a, R> {
    pub fn new(rewriter: &'a R, config: EngineConfig) -> Self {
        Self { rewriter, config }
    }

    /// Unconditional mean summary R over all `records`.
    pub fn summarize_mean(&self, records: &[StringRecord]) -> Result<Summary> {
        let start = Instant::now();
        let nb_records = records.len();
        let batches = make_batches(records, self.config.batch_size)?;
        info!(records = nb_records, batches = batches.len(), "Rewriting");

        let partials = run_batches(&batches, self.rewriter, || MeanSummarizer::new(nb_records))?;
        let summary = reduce_mean(&partials);

        info!(
            terms = summary.len(),
            duration_mins = start.elapsed().as_secs_f64() / 60.0,
            "Finished rewrite"
        );
        Ok(summary)
    }

    /// Conditional summary R_v over the records where every `premise` term has degree 1.
    pub fn summarize_satisfying(
        &self,
        records: &[StringRecord],
        premise: &[String],
        alpha: f64,
    ) -> Result<ConditionalSummary> {
        let start = Instant::now();
        let batches = make_batches(records, self.config.batch_size)?;
        info!(
            records = records.len(),
            batches = batches.len(),
            premise = ?premise,
            alpha,
            "Rewriting with terms"
        );

        let partials = run_batches(&batches, self.rewriter, || SatisfactionSummarizer::new(premise))?;
        let conditional = reduce_satisfaction(&partials, premise, alpha);

        info!(
            satisfying = conditional.total_satisfying_count,
            terms = conditional.summary.len(),
            duration_mins = start.elapsed().as_secs_f64() / 60.0,
            "Finished rewrite with terms"
        );
        Ok(conditional)
    }

    /// Association table of R against a conditional summary computed in this run.
    pub fn mine_associations(&self, r: &Summary, rv: &ConditionalSummary) -> AssociationTable {
        mine_associations(r, &rv.summary, Some(rv.total_satisfying_count), &self.config)
    }
}

/// Association table of R against R_v, `n` being the exact satisfying count when known.
pub fn mine_associations(
    r: &Summary,
    rv: &Summary,
    n: Option<usize>,
    config: &EngineConfig,
) -> AssociationTable {
    let start = Instant::now();
    let table = AssociationMiner::new(r, rv, n, config.certainty_threshold).mine();
    info!(
        terms = table.degrees.len(),
        duration_secs = start.elapsed().as_secs_f64(),
        "Finished assoc"
    );
    table
}
