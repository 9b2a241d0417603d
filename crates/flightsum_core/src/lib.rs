//! Parallel fuzzy linguistic summaries of flight records.
//!
//! A dataset is split into fixed-size batches, each batch is summarized by
//! its own worker, and the partial results are reduced into one global
//! summary under one of two normalization regimes (unconditional mean, or
//! mean over the records satisfying a premise). Two summaries then yield a
//! table of gradual association degrees between terms.

pub mod association;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod executor;
pub mod partition;
pub mod reducer;
pub mod summarizer;
pub mod summary;
pub mod vocabulary;

pub use association::{association, coverage, dependency, extract_terms, AssociationMiner};
pub use config::EngineConfig;
pub use dataset::Dataset;
pub use engine::{mine_associations, SummaryEngine};
pub use error::{Result, SummaryError};
pub use summary::{AssociationTable, ConditionalSummary, Summary};
pub use vocabulary::{RecordRewriter, Rewriter, RewrittenRecord, Vocabulary};
