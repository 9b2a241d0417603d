//! Raw dataset loading.
//!
//! The dataset is read fully into memory once per run: header first, then
//! one record per line. Blank lines, comment lines and repeated header lines
//! are skipped.

use crate::config::EngineConfig;
use crate::error::{Result, SummaryError};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub headers: StringRecord,
    pub records: Vec<StringRecord>,
}

impl Dataset {
    pub fn load(path: impl AsRef<Path>, config: &EngineConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SummaryError::from_io(path, e))?;
        let dataset = Self::from_reader(file, config)?;
        debug!(
            path = %path.display(),
            records = dataset.len(),
            columns = dataset.headers.len(),
            "Dataset loaded"
        );
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R, config: &EngineConfig) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .delimiter(config.delimiter_byte())
            .comment(config.comment_byte())
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let mut records = Vec::new();
        for record in reader.into_records() {
            let record = record?;
            if record == headers {
                continue;
            }
            records.push(record);
        }
        Ok(Self { headers, records })
    }

    /// Number of records, the global flight count used for mean normalization.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
