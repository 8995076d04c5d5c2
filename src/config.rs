//! Runtime configuration.
//!
//! One configuration surface for the whole process: reader endpoint, record
//! log destination, identifier marker, and the two poll intervals. Values
//! come from defaults, an optional JSON file, then command-line overrides.

use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reader host name or IP address
    pub reader_host: String,

    /// Reader port (LLRP default)
    pub reader_port: u16,

    /// Source-specific connection options, passed through untouched
    pub reader_options: Map<String, Value>,

    /// Record log destination
    pub output_path: PathBuf,

    /// Substring marking the identifying field of an event
    pub identifier_marker: String,

    /// Reading-flag poll interval of the ingest loop, in milliseconds.
    /// Lower values stop faster at the cost of more wakeups.
    pub ingest_poll_ms: u64,

    /// Presentation refresh interval, in milliseconds
    pub presentation_poll_ms: u64,

    /// fsync the record log after every append
    pub sync_on_write: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            reader_host: "192.168.2.2".to_string(),
            reader_port: 5084,
            reader_options: Map::new(),
            output_path: PathBuf::from("rfid_reads.csv"),
            identifier_marker: "EPC".to_string(),
            ingest_poll_ms: 100,
            presentation_poll_ms: 100,
            sync_on_write: false,
        }
    }
}

impl Config {
    /// Load a JSON config file. Missing keys fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| {
            IngestError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reader_host.trim().is_empty() {
            return Err(IngestError::Config("reader_host must not be empty".into()));
        }
        if self.identifier_marker.is_empty() {
            return Err(IngestError::Config(
                "identifier_marker must not be empty".into(),
            ));
        }
        if self.ingest_poll_ms == 0 || self.presentation_poll_ms == 0 {
            return Err(IngestError::Config(
                "poll intervals must be greater than zero".into(),
            ));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(IngestError::Config("output_path must not be empty".into()));
        }
        Ok(())
    }

    pub fn ingest_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ingest_poll_ms)
    }

    pub fn presentation_poll_interval(&self) -> Duration {
        Duration::from_millis(self.presentation_poll_ms)
    }
}
