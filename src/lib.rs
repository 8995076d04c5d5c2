//! # Tag Ingest
//!
//! Ingest pipeline for identifier events from a sensing device (an RFID
//! reader in practice):
//!
//! - [`source`]: the device connection, behind the [`EventSource`] trait
//! - [`ingest`]: extraction, per-session deduplication, batch processing
//! - [`record`]: durable append-only CSV log of every observation
//! - [`notify`]: hand-off of first sightings to the presentation side
//! - [`presentation`]: poll loop and sinks rendering the live view
//! - [`session`]: start/stop control and the ingest thread

pub mod config;
pub mod error;
pub mod ingest;
pub mod notify;
pub mod presentation;
pub mod record;
pub mod session;
pub mod source;
pub mod types;

pub use config::Config;
pub use error::{IngestError, Result};
pub use ingest::{extract_identifier, Deduplicator, IngestPipeline, SessionStats};
pub use notify::{Notification, NotificationReceiver, NotificationSender};
pub use presentation::{ConsoleSink, PollerConfig, PresentationPoller, PresentationSink};
pub use record::{CsvRecordStore, RecordStore, RecordStoreConfig};
pub use session::{CommandOutcome, ControllerConfig, SessionController};
pub use source::{BatchCallback, EventSource, SimulatedSource, SourceConfig, SourceEndpoint};
pub use types::{Event, EventBatch, Identifier, Observation, SessionState};
