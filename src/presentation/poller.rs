//! Presentation poll loop.
//!
//! Every tick drains *all* queued notifications before yielding. A sink
//! failure on one item is logged and the drain moves on to the next.

use super::PresentationSink;
use crate::notify::{Notification, NotificationReceiver, Poll};
use crate::types::SessionState;
use log::{debug, error, info};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

/// Configuration for the presentation poll loop.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Refresh interval. Shorter feels more live, longer wakes up less.
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
        }
    }
}

/// What one drain pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub processed: usize,
    pub render_failures: usize,
    /// Every producer is gone and nothing more will arrive
    pub closed: bool,
}

pub struct PresentationPoller<K: PresentationSink> {
    receiver: NotificationReceiver,
    sink: K,
    config: PollerConfig,
    count: usize,
    state: SessionState,
}

impl<K: PresentationSink> PresentationPoller<K> {
    pub fn new(receiver: NotificationReceiver, sink: K, config: PollerConfig) -> Self {
        Self {
            receiver,
            sink,
            config,
            count: 0,
            state: SessionState::Idle,
        }
    }

    /// Displayed count: distinct identifiers of the current session.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Last session state seen on the channel.
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Drain everything currently queued. Never blocks.
    pub fn drain_once(&mut self) -> DrainReport {
        let mut report = DrainReport::default();

        loop {
            match self.receiver.poll() {
                Poll::Item(notification) => {
                    report.processed += 1;
                    report.render_failures += self.render(notification);
                }
                Poll::Empty => break,
                Poll::Closed => {
                    report.closed = true;
                    break;
                }
            }
        }

        report
    }

    /// Returns the number of sink calls that failed.
    fn render(&mut self, notification: Notification) -> usize {
        let mut failures = 0;

        match notification {
            Notification::NewIdentifier(observation) => {
                self.count += 1;
                if let Err(e) = self.sink.on_new_identifier(&observation) {
                    error!(
                        "Presentation update failed for {}: {}",
                        observation.identifier(),
                        e
                    );
                    failures += 1;
                }
                if let Err(e) = self.sink.on_count_changed(self.count) {
                    error!("Presentation count update failed: {}", e);
                    failures += 1;
                }
            }
            Notification::SessionState(state) => {
                self.state = state;
                if state == SessionState::Reading {
                    self.count = 0;
                }
                if let Err(e) = self.sink.on_session_state_changed(state) {
                    error!("Presentation state update failed: {}", e);
                    failures += 1;
                }
                if state == SessionState::Reading {
                    if let Err(e) = self.sink.on_count_changed(0) {
                        error!("Presentation count update failed: {}", e);
                        failures += 1;
                    }
                }
            }
        }

        failures
    }

    /// Poll on a fixed cycle until `shutdown` flips to true or every
    /// producer has gone away. Returns the sink.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> K {
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.drain_once().closed {
                        info!("Notification channel closed, presentation loop exiting");
                        break;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.drain_once();
                        break;
                    }
                }
            }
        }

        self.sink
    }
}

/// Ask a running [`PresentationPoller::run`] loop to finish. Returns false
/// if the loop has already exited.
pub fn request_shutdown(shutdown: &watch::Sender<bool>) -> bool {
    if shutdown.send(true).is_err() {
        debug!("Presentation loop already exited");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IngestError, Result};
    use crate::notify;
    use crate::types::{Identifier, Observation};

    #[derive(Default)]
    struct RecordingSink {
        identifiers: Vec<String>,
        counts: Vec<usize>,
        states: Vec<SessionState>,
        fail_on: Option<String>,
    }

    impl PresentationSink for RecordingSink {
        fn on_new_identifier(&mut self, observation: &Observation) -> Result<()> {
            let id = observation.identifier().to_string();
            if self.fail_on.as_deref() == Some(id.as_str()) {
                return Err(IngestError::Presentation(format!("cannot render {}", id)));
            }
            self.identifiers.push(id);
            Ok(())
        }

        fn on_count_changed(&mut self, count: usize) -> Result<()> {
            self.counts.push(count);
            Ok(())
        }

        fn on_session_state_changed(&mut self, state: SessionState) -> Result<()> {
            self.states.push(state);
            Ok(())
        }
    }

    fn recording_poller(rx: notify::NotificationReceiver) -> PresentationPoller<RecordingSink> {
        PresentationPoller::new(rx, RecordingSink::default(), PollerConfig::default())
    }

    fn obs(id: &str) -> Observation {
        Observation::new(Identifier::new(id))
    }

    #[test]
    fn test_drains_everything_in_one_pass() {
        let (tx, rx) = notify::channel();
        let mut poller = recording_poller(rx);

        tx.session_state(SessionState::Reading);
        for id in ["E1", "E2", "E3"] {
            tx.new_identifier(obs(id));
        }

        let report = poller.drain_once();
        assert_eq!(report.processed, 4);
        assert!(!report.closed);
        assert_eq!(poller.count(), 3);
        assert_eq!(poller.sink().identifiers, vec!["E1", "E2", "E3"]);
        assert_eq!(poller.sink().counts, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_render_failure_does_not_stop_drain() {
        let (tx, rx) = notify::channel();
        let sink = RecordingSink {
            fail_on: Some("E2".to_string()),
            ..RecordingSink::default()
        };
        let mut poller = PresentationPoller::new(rx, sink, PollerConfig::default());

        for id in ["E1", "E2", "E3"] {
            tx.new_identifier(obs(id));
        }

        let report = poller.drain_once();
        assert_eq!(report.render_failures, 1);
        assert_eq!(poller.sink().identifiers, vec!["E1", "E3"]);
        assert_eq!(poller.count(), 3);
    }

    #[test]
    fn test_reading_resets_count() {
        let (tx, rx) = notify::channel();
        let mut poller = recording_poller(rx);

        tx.session_state(SessionState::Reading);
        tx.new_identifier(obs("E1"));
        tx.session_state(SessionState::Idle);
        tx.session_state(SessionState::Reading);
        poller.drain_once();

        assert_eq!(poller.count(), 0);
        assert_eq!(poller.state(), SessionState::Reading);
        assert_eq!(
            poller.sink().states,
            vec![SessionState::Reading, SessionState::Idle, SessionState::Reading]
        );
    }

    #[test]
    fn test_empty_poll_does_not_block() {
        let (_tx, rx) = notify::channel();
        let mut poller = recording_poller(rx);
        assert_eq!(poller.drain_once(), DrainReport::default());
    }

    #[tokio::test]
    async fn test_run_exits_when_producers_close() {
        let (tx, rx) = notify::channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let poller = PresentationPoller::new(
            rx,
            RecordingSink::default(),
            PollerConfig {
                interval: Duration::from_millis(5),
            },
        );

        tx.new_identifier(obs("E1"));
        drop(tx);

        let sink = poller.run(shutdown_rx).await;
        assert_eq!(sink.identifiers, vec!["E1"]);
    }

    #[tokio::test]
    async fn test_run_exits_on_shutdown() {
        let (tx, rx) = notify::channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let poller = PresentationPoller::new(
            rx,
            RecordingSink::default(),
            PollerConfig {
                interval: Duration::from_millis(5),
            },
        );

        let handle = tokio::spawn(poller.run(shutdown_rx));
        tx.new_identifier(obs("E7"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_tx.send(true).unwrap();

        let sink = handle.await.unwrap();
        assert_eq!(sink.identifiers, vec!["E7"]);
        drop(tx);
    }

    #[test]
    fn test_request_shutdown_reports_exited_loop() {
        let (tx, rx) = watch::channel(false);
        assert!(request_shutdown(&tx));
        assert!(*rx.borrow());

        drop(rx);
        assert!(!request_shutdown(&tx));
    }
}
