//! # Ingest Module
//!
//! Everything between a source callback and the two outputs of the
//! pipeline: the record log and the notification channel.
//!
//! ```text
//! callback ──push──▶ BatchQueue ──pop──▶ IngestPipeline
//!                                         ├─▶ RecordStore (every valid event)
//!                                         └─▶ Deduplicator ─first seen─▶ NotificationChannel
//! ```

pub mod dedup;
pub mod extract;
pub mod pipeline;
pub mod queue;

pub use dedup::{Deduplicator, Sighting};
pub use extract::{extract_identifier, DEFAULT_MARKER};
pub use pipeline::{BatchOutcome, IngestCounters, IngestPipeline, SessionStats};
pub use queue::BatchQueue;
