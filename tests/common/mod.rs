//! Shared fixtures for integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tag_ingest::{
    BatchCallback, ControllerConfig, CsvRecordStore, Event, EventBatch, EventSource,
    IngestError, Observation, PresentationSink, RecordStore, RecordStoreConfig, Result,
    SessionState, SourceConfig, SourceEndpoint,
};

// ============================================================================
// SOURCE
// ============================================================================

#[derive(Default)]
pub struct SourceShared {
    callback: Option<BatchCallback>,
    pub connected: bool,
    pub connects: usize,
    pub disconnects: usize,
    pub fail_connect: bool,
    pub disconnected_at: Option<Instant>,
}

/// Test-side handle to a [`ManualSource`].
#[derive(Clone, Default)]
pub struct SourceHandle {
    shared: Arc<Mutex<SourceShared>>,
}

impl SourceHandle {
    /// Invoke the registered callback as the device would. Returns false if
    /// the source is not connected.
    pub fn deliver(&self, batch: EventBatch) -> bool {
        let shared = self.shared.lock();
        match (&shared.callback, shared.connected) {
            (Some(callback), true) => {
                callback(batch);
                true
            }
            _ => false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.lock().connected
    }

    pub fn connects(&self) -> usize {
        self.shared.lock().connects
    }

    pub fn disconnects(&self) -> usize {
        self.shared.lock().disconnects
    }

    pub fn disconnected_at(&self) -> Option<Instant> {
        self.shared.lock().disconnected_at
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.shared.lock().fail_connect = fail;
    }
}

/// Source driven by the test thread through a [`SourceHandle`].
pub struct ManualSource {
    handle: SourceHandle,
}

impl ManualSource {
    pub fn new() -> (Self, SourceHandle) {
        let handle = SourceHandle::default();
        (
            Self {
                handle: handle.clone(),
            },
            handle,
        )
    }
}

impl EventSource for ManualSource {
    fn register_callback(&mut self, callback: BatchCallback) {
        self.handle.shared.lock().callback = Some(callback);
    }

    fn connect(&mut self, endpoint: &SourceEndpoint, _config: &SourceConfig) -> Result<()> {
        let mut shared = self.handle.shared.lock();
        if shared.fail_connect {
            return Err(IngestError::DeviceConnection {
                address: endpoint.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        shared.connected = true;
        shared.connects += 1;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        let mut shared = self.handle.shared.lock();
        shared.connected = false;
        shared.disconnects += 1;
        shared.disconnected_at = Some(Instant::now());
        Ok(())
    }
}

/// Source that delivers one-event batches from its own thread as fast as it
/// can. Callbacks and `disconnect` share a gate, so no callback is running
/// once `disconnect` returns.
pub struct StreamingSource {
    callback: Option<BatchCallback>,
    gate: Arc<Mutex<()>>,
    running: Arc<AtomicBool>,
    delivered: Arc<AtomicUsize>,
    worker: Option<JoinHandle<()>>,
}

impl StreamingSource {
    /// Returns the source and a counter of events handed to the callback.
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let delivered = Arc::new(AtomicUsize::new(0));
        (
            Self {
                callback: None,
                gate: Arc::new(Mutex::new(())),
                running: Arc::new(AtomicBool::new(false)),
                delivered: delivered.clone(),
                worker: None,
            },
            delivered,
        )
    }
}

impl EventSource for StreamingSource {
    fn register_callback(&mut self, callback: BatchCallback) {
        self.callback = Some(callback);
    }

    fn connect(&mut self, _endpoint: &SourceEndpoint, _config: &SourceConfig) -> Result<()> {
        let callback = self.callback.clone();
        let gate = self.gate.clone();
        let running = self.running.clone();
        let delivered = self.delivered.clone();
        running.store(true, Ordering::SeqCst);

        self.worker = Some(thread::spawn(move || {
            let mut seq = 0usize;
            loop {
                {
                    let _gate = gate.lock();
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    if let Some(callback) = &callback {
                        callback(vec![epc(&format!("S{}", seq))]);
                        delivered.fetch_add(1, Ordering::SeqCst);
                    }
                }
                seq += 1;
                thread::sleep(Duration::from_micros(200));
            }
        }));
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        {
            let _gate = self.gate.lock();
            self.running.store(false, Ordering::SeqCst);
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        Ok(())
    }
}

// ============================================================================
// STORE
// ============================================================================

/// CSV store that fails the listed append calls (0-based).
pub struct FlakyStore {
    inner: CsvRecordStore,
    fail_on: Vec<usize>,
    calls: Mutex<usize>,
}

impl FlakyStore {
    pub fn new(path: &Path, fail_on: Vec<usize>) -> Self {
        Self {
            inner: CsvRecordStore::new(RecordStoreConfig::new(path)),
            fail_on,
            calls: Mutex::new(0),
        }
    }
}

impl RecordStore for FlakyStore {
    fn append(&self, observation: &Observation) -> Result<()> {
        let call = {
            let mut calls = self.calls.lock();
            *calls += 1;
            *calls - 1
        };
        if self.fail_on.contains(&call) {
            return Err(IngestError::Persistence {
                path: PathBuf::from("flaky"),
                source: std::io::Error::other("simulated write failure"),
            });
        }
        self.inner.append(observation)
    }
}

// ============================================================================
// SINK
// ============================================================================

#[derive(Default)]
pub struct RecordingSink {
    pub identifiers: Vec<String>,
    pub counts: Vec<usize>,
    pub states: Vec<SessionState>,
}

impl PresentationSink for RecordingSink {
    fn on_new_identifier(&mut self, observation: &Observation) -> Result<()> {
        self.identifiers.push(observation.identifier().to_string());
        Ok(())
    }

    fn on_count_changed(&mut self, count: usize) -> Result<()> {
        self.counts.push(count);
        Ok(())
    }

    fn on_session_state_changed(&mut self, state: SessionState) -> Result<()> {
        if state == SessionState::Reading {
            self.identifiers.clear();
        }
        self.states.push(state);
        Ok(())
    }
}

// ============================================================================
// HELPERS
// ============================================================================

pub fn epc(id: &str) -> Event {
    Event::new().with_field("EPC_field", id)
}

pub fn fast_config() -> ControllerConfig {
    ControllerConfig {
        poll_interval: Duration::from_millis(20),
        ..ControllerConfig::default()
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Parsed record log: (identifier, timestamp) per line.
pub fn read_log(path: &Path) -> Vec<(String, String)> {
    let contents = std::fs::read_to_string(path).unwrap_or_default();
    contents
        .lines()
        .map(|line| {
            let (id, ts) = line.split_once(',').expect("two fields per record");
            (id.to_string(), ts.to_string())
        })
        .collect()
}
