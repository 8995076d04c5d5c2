//! # CSV Record Writer
//!
//! Appends one `identifier,timestamp` line per observation. The file is
//! opened in append mode for each record and closed again, so a crash never
//! loses more than the record in flight and external tools can rotate or
//! tail the file freely.

use super::RecordStore;
use crate::error::{IngestError, Result};
use crate::types::Observation;
use csv::{Terminator, WriterBuilder};
use log::debug;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Record store configuration
#[derive(Debug, Clone)]
pub struct RecordStoreConfig {
    /// Log file path, created if absent
    pub path: PathBuf,

    /// Call `sync_data` after each record (flush always happens)
    pub sync_on_write: bool,
}

impl RecordStoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sync_on_write: false,
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            path: config.output_path.clone(),
            sync_on_write: config.sync_on_write,
        }
    }
}

/// Thread-safe CSV record store
pub struct CsvRecordStore {
    config: RecordStoreConfig,
    write_lock: Mutex<()>,
    records_written: AtomicU64,
    failed_writes: AtomicU64,
}

impl CsvRecordStore {
    pub fn new(config: RecordStoreConfig) -> Self {
        CsvRecordStore {
            config,
            write_lock: Mutex::new(()),
            records_written: AtomicU64::new(0),
            failed_writes: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn stats(&self) -> RecordStoreStats {
        RecordStoreStats {
            path: self.config.path.clone(),
            records_written: self.records_written.load(Ordering::Relaxed),
            failed_writes: self.failed_writes.load(Ordering::Relaxed),
        }
    }

    fn write_record(&self, observation: &Observation) -> Result<()> {
        let path = &self.config.path;
        let persistence = |source: std::io::Error| IngestError::Persistence {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(persistence)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(persistence)?;

        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(&file);
        let timestamp = observation.timestamp_text();
        writer
            .write_record([observation.identifier().as_str(), timestamp.as_str()])
            .map_err(|e| csv_failure(path, e))?;
        writer.flush().map_err(persistence)?;
        drop(writer);

        if self.config.sync_on_write {
            file.sync_data().map_err(persistence)?;
        }

        Ok(())
    }
}

/// I/O failures surfaced by the csv writer are persistence failures; the
/// rest are encoding failures.
fn csv_failure(path: &Path, err: csv::Error) -> IngestError {
    if !err.is_io_error() {
        return IngestError::Encoding(err);
    }
    let source = match err.into_kind() {
        csv::ErrorKind::Io(source) => source,
        kind => std::io::Error::other(format!("{:?}", kind)),
    };
    IngestError::Persistence {
        path: path.to_path_buf(),
        source,
    }
}

impl RecordStore for CsvRecordStore {
    fn append(&self, observation: &Observation) -> Result<()> {
        let _guard = self.write_lock.lock();

        match self.write_record(observation) {
            Ok(()) => {
                self.records_written.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Saved record: identifier={}, timestamp={}",
                    observation.identifier(),
                    observation.timestamp_text()
                );
                Ok(())
            }
            Err(e) => {
                self.failed_writes.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }
}

/// Counters for the record log
#[derive(Debug, Clone)]
pub struct RecordStoreStats {
    pub path: PathBuf,
    pub records_written: u64,
    pub failed_writes: u64,
}
