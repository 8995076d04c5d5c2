//! Line-oriented sink for terminals and log files.

use super::PresentationSink;
use crate::error::{IngestError, Result};
use crate::types::{Observation, SessionState};
use std::io::Write;

/// Writes one line per update and keeps the rendered entries of the
/// current session.
pub struct ConsoleSink<W: Write + Send> {
    out: W,
    history: Vec<String>,
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            history: Vec::new(),
        }
    }

    /// Entries rendered since the current session started.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{}", text)
            .and_then(|()| self.out.flush())
            .map_err(|e| IngestError::Presentation(e.to_string()))
    }
}

impl<W: Write + Send> PresentationSink for ConsoleSink<W> {
    fn on_new_identifier(&mut self, observation: &Observation) -> Result<()> {
        let entry = format!(
            "{} — {}",
            observation.identifier(),
            observation.timestamp_text()
        );
        self.line(&entry)?;
        self.history.push(entry);
        Ok(())
    }

    fn on_count_changed(&mut self, count: usize) -> Result<()> {
        self.line(&format!("Total Tags: {}", count))
    }

    fn on_session_state_changed(&mut self, state: SessionState) -> Result<()> {
        if state == SessionState::Reading {
            self.history.clear();
        }
        self.line(&format!("Status: {}", state))
    }
}
