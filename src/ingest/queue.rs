//! Hand-off of raw batches from source callbacks to the ingest thread.
//!
//! The callback only pushes; all processing happens on the ingest thread.
//! The ingest thread waits with a timeout so it can re-check the reading
//! flag even when the device is silent.

use crate::types::EventBatch;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Default)]
struct QueueInner {
    batches: VecDeque<EventBatch>,
    closed: bool,
}

#[derive(Default)]
pub struct BatchQueue {
    inner: Mutex<QueueInner>,
    ready: Condvar,
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a batch. Returns `false` if the queue was closed, in which
    /// case the batch is handed back to the caller's drop.
    pub fn push(&self, batch: EventBatch) -> bool {
        let mut inner = self.inner.lock();
        if inner.closed {
            return false;
        }
        inner.batches.push_back(batch);
        drop(inner);
        self.ready.notify_one();
        true
    }

    /// Next batch, waiting up to `timeout` for one to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<EventBatch> {
        let mut inner = self.inner.lock();
        if inner.batches.is_empty() && !inner.closed {
            self.ready.wait_for(&mut inner, timeout);
        }
        inner.batches.pop_front()
    }

    /// Take every queued batch without waiting.
    pub fn drain(&self) -> Vec<EventBatch> {
        self.inner.lock().batches.drain(..).collect()
    }

    /// Refuse further pushes and return what was still queued.
    pub fn close(&self) -> Vec<EventBatch> {
        let mut inner = self.inner.lock();
        inner.closed = true;
        let rest = inner.batches.drain(..).collect();
        drop(inner);
        self.ready.notify_all();
        rest
    }

    pub fn len(&self) -> usize {
        self.inner.lock().batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
