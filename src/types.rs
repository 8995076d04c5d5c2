//! Core data types shared across the pipeline.

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Format of every timestamp written to the record log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local wall-clock time, truncated to whole seconds.
pub fn now_seconds() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Raw event payload delivered by an event source.
///
/// Field order is the order the source produced them in, which matters for
/// identifier extraction (first matching field wins).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    fields: Map<String, Value>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion, keeps insertion order.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for Event {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// A batch of events as delivered by one source callback.
pub type EventBatch = Vec<Event>;

/// Token naming a sensed object. Session-scoped dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Sentinel for events without a usable identifying field.
    pub const UNKNOWN: &'static str = "UNKNOWN";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An (identifier, timestamp) pair. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    identifier: Identifier,
    timestamp: NaiveDateTime,
}

impl Observation {
    /// Observation stamped with the current time.
    pub fn new(identifier: Identifier) -> Self {
        Self::at(identifier, now_seconds())
    }

    pub fn at(identifier: Identifier, timestamp: NaiveDateTime) -> Self {
        Self {
            identifier,
            timestamp,
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Timestamp rendered as `YYYY-MM-DD HH:MM:SS`.
    pub fn timestamp_text(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Session state as seen by the control surface and the presentation side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Reading,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("Idle"),
            SessionState::Reading => f.write_str("Reading"),
        }
    }
}
