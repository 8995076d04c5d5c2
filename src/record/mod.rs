//! # Record Store
//!
//! Durable, append-only history of every valid observation, including
//! repeats. Deduplication never reaches this layer.

pub mod writer;

pub use writer::{CsvRecordStore, RecordStoreConfig, RecordStoreStats};

use crate::error::Result;
use crate::types::Observation;

/// Append-only sink for observations.
///
/// Implementations must serialize concurrent appends so the log stays
/// well-formed if more than one producer ever calls in.
pub trait RecordStore: Send + Sync {
    /// Append one observation and make sure it has left process buffers
    /// before returning.
    fn append(&self, observation: &Observation) -> Result<()>;
}
