use serde::{Deserialize, Serialize};

/// Records per batch. Bounds per-worker memory since every batch is dispatched eagerly.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Degree at or above which a conditional term counts as practically certain.
pub const DEFAULT_CERTAINTY_THRESHOLD: f64 = 0.999;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of records handed to each worker
    pub batch_size: usize,

    /// Lines starting with this byte are skipped
    pub comment_marker: char,

    /// Field delimiter of the dataset
    pub delimiter: char,

    /// Conditional degree from which a term is extracted as a premise candidate
    pub certainty_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            comment_marker: '#',
            delimiter: ',',
            certainty_threshold: DEFAULT_CERTAINTY_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Single-byte form of the comment marker; non-ASCII markers disable comment skipping.
    pub fn comment_byte(&self) -> Option<u8> {
        u8::try_from(self.comment_marker).ok().filter(u8::is_ascii)
    }

    /// Single-byte form of the delimiter, `,` when the configured one is not ASCII.
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .unwrap_or(b',')
    }
}
