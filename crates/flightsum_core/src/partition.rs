use crate::error::{Result, SummaryError};

/// Splits `records` into contiguous batches of `batch_size`; the last batch holds the remainder.
///
/// Deterministic and lossless: concatenating the batches reproduces `records`,
/// and there are exactly `ceil(records.len() / batch_size)` of them.
pub fn make_batches<T>(records: &[T], batch_size: usize) -> Result<Vec<&[T]>> {
    if batch_size == 0 {
        return Err(SummaryError::InvalidBatchSize);
    }
    Ok(records.chunks(batch_size).collect())
}
