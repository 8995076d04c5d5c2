//! # Presentation
//!
//! Consumer side of the notification channel. A poller drains the channel
//! on a fixed cycle and drives a [`PresentationSink`]; the sink only renders.

pub mod console;
pub mod poller;

pub use console::ConsoleSink;
pub use poller::{request_shutdown, DrainReport, PollerConfig, PresentationPoller};

use crate::error::Result;
use crate::types::{Observation, SessionState};

/// Renders the live view.
///
/// A transition to [`SessionState::Reading`] always marks a fresh session:
/// sinks drop any history rendered for the previous one.
pub trait PresentationSink: Send {
    fn on_new_identifier(&mut self, observation: &Observation) -> Result<()>;

    fn on_count_changed(&mut self, count: usize) -> Result<()>;

    fn on_session_state_changed(&mut self, state: SessionState) -> Result<()>;
}
