//! Shared-nothing fan-out: one worker thread per batch.
//!
//! Result slots are allocated before dispatch and slot `i` is only ever
//! written by worker `i`, so collecting partials needs no lock. The join
//! barrier is the end of the thread scope; any failing worker aborts the run.

use crate::error::{Result, SummaryError};
use crate::summarizer::BatchSummarizer;
use crate::vocabulary::Rewriter;
use csv::StringRecord;
use std::any::Any;
use std::thread::{self, ScopedJoinHandle};
use tracing::{debug, error};

/// Runs one summarizer to completion over one batch, rewriting records on the fly.
pub fn summarize_batch<S, R>(mut summarizer: S, batch: &[StringRecord], rewriter: &R) -> Result<S::Partial>
where
    S: BatchSummarizer,
    R: Rewriter + ?Sized,
{
    for record in batch {
        let rewritten = rewriter.rewrite(record)?;
        summarizer.add_record(&rewritten);
    }
    Ok(summarizer.into_partial())
}

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Joins every spawned worker, then reports the lowest-indexed failure.
///
/// `spawn_failure` belongs to the batch after the last spawned one, so a
/// worker panic takes precedence over it.
fn join_workers<'scope>(
    handles: Vec<(usize, ScopedJoinHandle<'scope, ()>)>,
    spawn_failure: Option<SummaryError>,
) -> Result<()> {
    let mut first_failure = None;
    for (index, handle) in handles {
        if let Err(payload) = handle.join() {
            let reason = panic_reason(payload);
            error!(batch = index, reason = %reason, "Worker panicked");
            first_failure.get_or_insert(SummaryError::WorkerFailure { batch: index, reason });
        }
    }
    match first_failure.or(spawn_failure) {
        Some(failure) => Err(failure),
        None => Ok(()),
    }
}

/// Summarizes every batch concurrently and returns the partials in batch order.
///
/// Args:
///     batches: Contiguous slices produced by the partitioner.
///     rewriter: Record source shared read-only by all workers.
///     new_summarizer: Builds a fresh summarizer for each batch.
///
/// Returns:
///     One partial per batch, or the first worker failure.
pub fn run_batches<S, R, F>(
    batches: &[&[StringRecord]],
    rewriter: &R,
    new_summarizer: F,
) -> Result<Vec<S::Partial>>
where
    S: BatchSummarizer,
    R: Rewriter + ?Sized,
    F: Fn() -> S + Sync,
{
    let mut slots: Vec<Option<Result<S::Partial>>> = (0..batches.len()).map(|_| None).collect();

    thread::scope(|scope| -> Result<()> {
        let mut handles = Vec::with_capacity(batches.len());
        let mut spawn_failure = None;
        for (index, (batch, slot)) in batches.iter().zip(slots.iter_mut()).enumerate() {
            let new_summarizer = &new_summarizer;
            let spawned = thread::Builder::new()
                .name(format!("batch-{index}"))
                .spawn_scoped(scope, move || {
                    let summarizer = new_summarizer();
                    debug!(batch = index, records = batch.len(), summarizer = summarizer.name(), "Worker started");
                    *slot = Some(summarize_batch(summarizer, batch, rewriter));
                });
            match spawned {
                Ok(handle) => handles.push((index, handle)),
                Err(e) => {
                    error!(batch = index, error = %e, "Could not spawn worker");
                    spawn_failure = Some(SummaryError::WorkerFailure {
                        batch: index,
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }
        join_workers(handles, spawn_failure)
    })?;

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| match slot {
            Some(Ok(partial)) => Ok(partial),
            Some(Err(e)) => Err(SummaryError::WorkerFailure {
                batch: index,
                reason: e.to_string(),
            }),
            None => Err(SummaryError::WorkerFailure {
                batch: index,
                reason: "worker produced no result".to_string(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::make_batches;
    use crate::summarizer::MeanSummarizer;
    use crate::vocabulary::RewrittenRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Reads column 0 as the degree of term "A".
    struct ColumnRewriter;

    impl Rewriter for ColumnRewriter {
        fn rewrite(&self, record: &StringRecord) -> Result<RewrittenRecord> {
            let degree: f64 = record[0]
                .parse()
                .map_err(|_| SummaryError::Vocabulary(format!("bad degree {}", &record[0])))?;
            Ok([("A", degree)].into_iter().collect())
        }
    }

    struct PanickingRewriter;

    impl Rewriter for PanickingRewriter {
        fn rewrite(&self, _record: &StringRecord) -> Result<RewrittenRecord> {
            panic!("rewriter exploded");
        }
    }

    fn records(values: &[&str]) -> Vec<StringRecord> {
        values.iter().map(|v| StringRecord::from(vec![*v])).collect()
    }

    #[test]
    fn test_partials_in_batch_order() {
        let records = records(&["1", "0", "0.5", "1"]);
        let batches = make_batches(&records, 1).unwrap();
        let partials = run_batches(&batches, &ColumnRewriter, || MeanSummarizer::new(4)).unwrap();
        let degrees: Vec<f64> = partials.iter().map(|p| p.degrees["A"]).collect();
        assert_eq!(degrees, vec![0.25, 0.0, 0.125, 0.25]);
    }

    #[test]
    fn test_rewrite_error_aborts_run() {
        let records = records(&["1", "oops", "0"]);
        let batches = make_batches(&records, 1).unwrap();
        let err = run_batches(&batches, &ColumnRewriter, || MeanSummarizer::new(3)).unwrap_err();
        assert!(matches!(err, SummaryError::WorkerFailure { batch: 1, .. }));
    }

    #[test]
    fn test_panic_aborts_run() {
        let records = records(&["1", "0"]);
        let batches = make_batches(&records, 1).unwrap();
        let err = run_batches(&batches, &PanickingRewriter, || MeanSummarizer::new(2)).unwrap_err();
        match err {
            SummaryError::WorkerFailure { reason, .. } => assert!(reason.contains("exploded")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_no_batches() {
        let partials = run_batches(&[], &ColumnRewriter, || MeanSummarizer::new(0)).unwrap();
        assert!(partials.is_empty());
    }

    #[test]
    fn test_spawn_failure_waits_for_running_workers() {
        let finished = AtomicUsize::new(0);
        thread::scope(|scope| {
            let handles: Vec<_> = (0..3)
                .map(|index| {
                    let finished = &finished;
                    let handle = scope.spawn(move || {
                        thread::sleep(Duration::from_millis(20));
                        finished.fetch_add(1, Ordering::SeqCst);
                    });
                    (index, handle)
                })
                .collect();
            let failure = SummaryError::WorkerFailure {
                batch: 3,
                reason: "out of threads".to_string(),
            };
            let err = join_workers(handles, Some(failure)).unwrap_err();
            assert_eq!(finished.load(Ordering::SeqCst), 3);
            assert!(matches!(err, SummaryError::WorkerFailure { batch: 3, .. }));
        });
    }

    #[test]
    fn test_panic_reported_before_spawn_failure() {
        thread::scope(|scope| {
            let handles = vec![
                (0, scope.spawn(|| {})),
                (1, scope.spawn(|| panic!("batch one failed"))),
            ];
            let failure = SummaryError::WorkerFailure {
                batch: 2,
                reason: "out of threads".to_string(),
            };
            let err = join_workers(handles, Some(failure)).unwrap_err();
            assert!(matches!(err, SummaryError::WorkerFailure { batch: 1, .. }));
        });
    }
}
