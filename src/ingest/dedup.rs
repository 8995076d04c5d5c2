//! Session-scoped deduplication.

use crate::types::Identifier;
use std::collections::HashSet;

/// Whether an identifier is new to the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sighting {
    FirstSeen,
    Repeat,
}

/// Set of identifiers seen during one session.
///
/// Not thread-safe. It lives on the ingest thread for the whole session;
/// a new session gets a new, empty instance.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<Identifier>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `identifier`, recording it if it is new.
    pub fn observe(&mut self, identifier: &Identifier) -> Sighting {
        if self.seen.contains(identifier) {
            Sighting::Repeat
        } else {
            self.seen.insert(identifier.clone());
            Sighting::FirstSeen
        }
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.seen.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
