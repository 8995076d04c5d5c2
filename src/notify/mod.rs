//! # Notification Channel
//!
//! FIFO hand-off from the ingest thread to the presentation poller. The
//! producer never blocks; the consumer polls and never waits on an empty
//! channel. Session state markers travel on the same channel so a session
//! reset is ordered with respect to the observations around it.

use crate::types::{Observation, SessionState};
use log::warn;
use tokio::sync::mpsc::{self, error::TryRecvError};

/// One item on the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// First sighting of an identifier in the current session
    NewIdentifier(Observation),
    /// Session state transition. `Reading` always marks a fresh session.
    SessionState(SessionState),
}

/// Create a connected sender/receiver pair.
pub fn channel() -> (NotificationSender, NotificationReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (NotificationSender { tx }, NotificationReceiver { rx })
}

/// Producer half. Cheap to clone.
#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationSender {
    /// Enqueue without blocking. Returns `false` (and logs) if the
    /// consumer is gone.
    pub fn send(&self, notification: Notification) -> bool {
        match self.tx.send(notification) {
            Ok(()) => true,
            Err(mpsc::error::SendError(lost)) => {
                warn!("Notification consumer closed, dropping {:?}", lost);
                false
            }
        }
    }

    pub fn new_identifier(&self, observation: Observation) -> bool {
        self.send(Notification::NewIdentifier(observation))
    }

    pub fn session_state(&self, state: SessionState) -> bool {
        self.send(Notification::SessionState(state))
    }
}

/// Consumer half.
#[derive(Debug)]
pub struct NotificationReceiver {
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl NotificationReceiver {
    /// Next queued item, if any. Never blocks.
    pub fn poll(&mut self) -> Poll {
        match self.rx.try_recv() {
            Ok(item) => Poll::Item(item),
            Err(TryRecvError::Empty) => Poll::Empty,
            Err(TryRecvError::Disconnected) => Poll::Closed,
        }
    }

    /// Take everything currently queued.
    pub fn drain(&mut self) -> Vec<Notification> {
        let mut items = Vec::new();
        while let Poll::Item(item) = self.poll() {
            items.push(item);
        }
        items
    }
}

/// Result of a single non-blocking poll.
#[derive(Debug, PartialEq, Eq)]
pub enum Poll {
    Item(Notification),
    Empty,
    /// All senders dropped and the queue is empty
    Closed,
}
