//! Per-batch processing: extract, persist, deduplicate, notify.

use super::dedup::{Deduplicator, Sighting};
use super::extract::extract_identifier;
use crate::notify::NotificationSender;
use crate::record::RecordStore;
use crate::types::{Event, EventBatch, Observation};
use log::{error, warn};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Live counters for the current session, readable from any thread.
#[derive(Debug, Default)]
pub struct IngestCounters {
    events_processed: AtomicU64,
    records_appended: AtomicU64,
    append_failures: AtomicU64,
    unknown_skipped: AtomicU64,
    notifications_sent: AtomicU64,
    distinct_seen: AtomicUsize,
}

impl IngestCounters {
    pub fn reset(&self) {
        self.events_processed.store(0, Ordering::SeqCst);
        self.records_appended.store(0, Ordering::SeqCst);
        self.append_failures.store(0, Ordering::SeqCst);
        self.unknown_skipped.store(0, Ordering::SeqCst);
        self.notifications_sent.store(0, Ordering::SeqCst);
        self.distinct_seen.store(0, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> SessionStats {
        SessionStats {
            events_processed: self.events_processed.load(Ordering::SeqCst),
            records_appended: self.records_appended.load(Ordering::SeqCst),
            append_failures: self.append_failures.load(Ordering::SeqCst),
            unknown_skipped: self.unknown_skipped.load(Ordering::SeqCst),
            notifications_sent: self.notifications_sent.load(Ordering::SeqCst),
            distinct_seen: self.distinct_seen.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time copy of [`IngestCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Events fully handled, including skipped ones
    pub events_processed: u64,
    pub records_appended: u64,
    pub append_failures: u64,
    pub unknown_skipped: u64,
    pub notifications_sent: u64,
    /// Size of the session's seen set
    pub distinct_seen: usize,
}

/// What one batch did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub appended: usize,
    pub append_failures: usize,
    pub skipped: usize,
    pub first_seen: usize,
}

/// Processes batches for exactly one session.
pub struct IngestPipeline {
    marker: String,
    dedup: Deduplicator,
    store: Arc<dyn RecordStore>,
    notifier: NotificationSender,
    counters: Arc<IngestCounters>,
}

impl IngestPipeline {
    pub fn new(
        marker: impl Into<String>,
        store: Arc<dyn RecordStore>,
        notifier: NotificationSender,
        counters: Arc<IngestCounters>,
    ) -> Self {
        Self {
            marker: marker.into(),
            dedup: Deduplicator::new(),
            store,
            notifier,
            counters,
        }
    }

    pub fn seen_count(&self) -> usize {
        self.dedup.len()
    }

    /// Run every event of `batch` through the pipeline.
    ///
    /// Every event with a usable identifier is appended to the record store,
    /// repeats included. Only first sightings are forwarded to the
    /// notification channel. Append failures never stop the batch.
    pub fn process_batch(&mut self, batch: EventBatch) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for event in batch {
            self.process_event(&event, &mut outcome);
            self.counters.events_processed.fetch_add(1, Ordering::SeqCst);
        }

        outcome
    }

    fn process_event(&mut self, event: &Event, outcome: &mut BatchOutcome) {
        let identifier = extract_identifier(event, &self.marker);
        if identifier.is_unknown() {
            warn!("Event has no {} field, skipping: {:?}", self.marker, event);
            self.counters.unknown_skipped.fetch_add(1, Ordering::SeqCst);
            outcome.skipped += 1;
            return;
        }

        let observation = Observation::new(identifier);

        match self.store.append(&observation) {
            Ok(()) => {
                self.counters.records_appended.fetch_add(1, Ordering::SeqCst);
                outcome.appended += 1;
            }
            Err(e) => {
                error!(
                    "Failed to record observation {}: {}",
                    observation.identifier(),
                    e
                );
                self.counters.append_failures.fetch_add(1, Ordering::SeqCst);
                outcome.append_failures += 1;
            }
        }

        if self.dedup.observe(observation.identifier()) == Sighting::FirstSeen {
            self.counters
                .distinct_seen
                .store(self.dedup.len(), Ordering::SeqCst);
            outcome.first_seen += 1;
            if self.notifier.new_identifier(observation) {
                self.counters.notifications_sent.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}
