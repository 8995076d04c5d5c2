//! Error types for the ingest pipeline.
//!
//! None of these are fatal to the process. Each is isolated to the item,
//! batch or session that raised it and is logged where it is caught.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("device connection to {address} failed: {reason}")]
    DeviceConnection { address: String, reason: String },

    #[error("failed to append record to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode record: {0}")]
    Encoding(#[from] csv::Error),

    #[error("presentation failed: {0}")]
    Presentation(String),

    #[error("failed to spawn ingest thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;
