//! # Session Controller
//!
//! Owns the Idle/Reading state machine and the ingest thread.
//!
//! The reading flag is the only thing the ingest thread consults to decide
//! whether to keep going. `stop()` clears it and returns; the ingest thread
//! notices within one poll interval, disconnects the source, finishes every
//! batch delivered before the disconnect and exits.

use crate::config::Config;
use crate::error::{IngestError, Result};
use crate::ingest::{BatchQueue, IngestCounters, IngestPipeline, SessionStats};
use crate::notify::NotificationSender;
use crate::record::RecordStore;
use crate::source::{EventSource, SourceConfig, SourceEndpoint};
use crate::types::SessionState;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use uuid::Uuid;

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Where the source connects to
    pub endpoint: SourceEndpoint,
    /// Options handed to the source on connect
    pub source_config: SourceConfig,
    /// Substring marking the identifying field
    pub identifier_marker: String,
    /// How often the ingest loop re-checks the reading flag
    pub poll_interval: Duration,
}

impl ControllerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            endpoint: SourceEndpoint::new(config.reader_host.clone(), config.reader_port),
            source_config: SourceConfig {
                options: config.reader_options.clone(),
            },
            identifier_marker: config.identifier_marker.clone(),
            poll_interval: config.ingest_poll_interval(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Result of a control command. Redundant commands are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    NoOp,
}

pub struct SessionController<S: EventSource + 'static> {
    config: ControllerConfig,
    source: Arc<Mutex<S>>,
    store: Arc<dyn RecordStore>,
    notifier: NotificationSender,
    reading: Arc<AtomicBool>,
    counters: Arc<IngestCounters>,
    session_id: Option<Uuid>,
    ingest: Option<JoinHandle<()>>,
}

impl<S: EventSource + 'static> SessionController<S> {
    pub fn new(
        config: ControllerConfig,
        source: S,
        store: Arc<dyn RecordStore>,
        notifier: NotificationSender,
    ) -> Self {
        Self {
            config,
            source: Arc::new(Mutex::new(source)),
            store,
            notifier,
            reading: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(IngestCounters::default()),
            session_id: None,
            ingest: None,
        }
    }

    /// Begin a new session.
    ///
    /// Waits for a previous session's ingest thread to finish, resets the
    /// seen set and counters, tells the presentation side to reset, then
    /// spawns the ingest thread, which connects the source.
    pub fn start(&mut self) -> Result<CommandOutcome> {
        if self.reading.load(Ordering::SeqCst) {
            warn!("Already reading, ignoring start");
            return Ok(CommandOutcome::NoOp);
        }

        self.join_ingest();

        let session_id = Uuid::new_v4();
        self.counters.reset();
        let pipeline = IngestPipeline::new(
            self.config.identifier_marker.clone(),
            self.store.clone(),
            self.notifier.clone(),
            self.counters.clone(),
        );
        self.notifier.session_state(SessionState::Reading);
        self.reading.store(true, Ordering::SeqCst);

        let context = IngestContext {
            session_id,
            source: self.source.clone(),
            endpoint: self.config.endpoint.clone(),
            source_config: self.config.source_config.clone(),
            poll_interval: self.config.poll_interval,
            reading: self.reading.clone(),
            notifier: self.notifier.clone(),
            counters: self.counters.clone(),
            pipeline,
        };

        let spawned = thread::Builder::new()
            .name("ingest".to_string())
            .spawn(move || run_ingest(context));

        match spawned {
            Ok(handle) => {
                self.ingest = Some(handle);
                self.session_id = Some(session_id);
                info!("Session {} started", session_id);
                Ok(CommandOutcome::Applied)
            }
            Err(e) => {
                self.reading.store(false, Ordering::SeqCst);
                self.notifier.session_state(SessionState::Idle);
                Err(IngestError::ThreadSpawn(e))
            }
        }
    }

    /// End the current session. Does not wait for the ingest thread.
    pub fn stop(&self) -> CommandOutcome {
        if self
            .reading
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Not currently reading, ignoring stop");
            return CommandOutcome::NoOp;
        }

        self.notifier.session_state(SessionState::Idle);
        if let Some(id) = self.session_id {
            info!("Session {} stopping", id);
        }
        CommandOutcome::Applied
    }

    /// Stop if reading and wait for the ingest thread to exit.
    pub fn dispose(&mut self) {
        if self.reading.load(Ordering::SeqCst) {
            self.stop();
        }
        self.join_ingest();
    }

    pub fn state(&self) -> SessionState {
        if self.reading.load(Ordering::SeqCst) {
            SessionState::Reading
        } else {
            SessionState::Idle
        }
    }

    pub fn is_reading(&self) -> bool {
        self.state() == SessionState::Reading
    }

    /// Id of the current session, or of the last one once stopped.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn stats(&self) -> SessionStats {
        self.counters.snapshot()
    }

    /// Distinct identifiers seen in the current session.
    pub fn seen_count(&self) -> usize {
        self.counters.snapshot().distinct_seen
    }

    /// True while an ingest thread is still alive, including the tail of a
    /// stopped session that is draining or disconnecting.
    pub fn is_ingest_running(&self) -> bool {
        self.ingest
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    fn join_ingest(&mut self) {
        if let Some(handle) = self.ingest.take() {
            if handle.join().is_err() {
                error!("Ingest thread panicked");
            }
        }
    }
}

impl<S: EventSource + 'static> Drop for SessionController<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Everything one session's ingest thread owns or shares.
struct IngestContext<S> {
    session_id: Uuid,
    source: Arc<Mutex<S>>,
    endpoint: SourceEndpoint,
    source_config: SourceConfig,
    poll_interval: Duration,
    reading: Arc<AtomicBool>,
    notifier: NotificationSender,
    counters: Arc<IngestCounters>,
    pipeline: IngestPipeline,
}

fn run_ingest<S: EventSource>(mut ctx: IngestContext<S>) {
    let queue = Arc::new(BatchQueue::new());

    {
        let callback_queue = queue.clone();
        let mut source = ctx.source.lock();
        source.register_callback(Arc::new(move |batch| {
            if !callback_queue.push(batch) {
                warn!("Batch delivered after disconnect, discarding");
            }
        }));

        info!("Connecting to reader at {}", ctx.endpoint);
        if let Err(e) = source.connect(&ctx.endpoint, &ctx.source_config) {
            drop(source);
            error!("Session {} aborted: {}", ctx.session_id, e);
            queue.close();
            if ctx
                .reading
                .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                ctx.notifier.session_state(SessionState::Idle);
            }
            return;
        }
    }
    info!("Reader connected, session {} reading", ctx.session_id);

    while ctx.reading.load(Ordering::SeqCst) {
        if let Some(batch) = queue.pop_timeout(ctx.poll_interval) {
            ctx.pipeline.process_batch(batch);
        }
    }

    // batches delivered before the flag was seen still count
    for batch in queue.drain() {
        ctx.pipeline.process_batch(batch);
    }

    info!("Stopping reader...");
    match ctx.source.lock().disconnect() {
        Ok(()) => info!("Reader disconnected"),
        Err(e) => error!("Failed to disconnect reader: {}", e),
    }

    // no callback runs once disconnect has returned, so whatever is still
    // queued was delivered before it began
    let remaining = queue.close();
    if !remaining.is_empty() {
        debug!(
            "Processing {} batch(es) delivered before disconnect",
            remaining.len()
        );
        for batch in remaining {
            ctx.pipeline.process_batch(batch);
        }
    }

    let stats = ctx.counters.snapshot();
    info!(
        "Session {} ended: {} events, {} records, {} distinct, {} skipped, {} append failures",
        ctx.session_id,
        stats.events_processed,
        stats.records_appended,
        stats.distinct_seen,
        stats.unknown_skipped,
        stats.append_failures
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_config_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.endpoint, SourceEndpoint::new("192.168.2.2", 5084));
        assert_eq!(config.identifier_marker, "EPC");
        assert_eq!(config.poll_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_controller_config_custom() {
        let config = Config {
            reader_host: "10.1.1.1".to_string(),
            ingest_poll_ms: 20,
            ..Config::default()
        };
        let controller_config = ControllerConfig::from_config(&config);
        assert_eq!(controller_config.endpoint.to_string(), "10.1.1.1:5084");
        assert_eq!(controller_config.poll_interval, Duration::from_millis(20));
    }
}
