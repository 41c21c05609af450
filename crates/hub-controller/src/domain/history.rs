//! Bounded, ordered message history for one room.
//!
//! Appending past [`HISTORY_CAPACITY`] evicts the oldest entry whether or
//! not it was deleted. Deletion never removes an entry, so positions stay
//! stable for clients that fetched history earlier.

use super::message::ChatMessage;
use std::collections::VecDeque;

/// Maximum number of messages retained per room.
pub const HISTORY_CAPACITY: usize = 100;

/// Why a message id did not resolve to exactly one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupFailure {
    NotFound,
    Ambiguous,
}

#[derive(Debug, Clone)]
pub struct MessageHistory {
    entries: VecDeque<ChatMessage>,
    capacity: usize,
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message, returning the evicted entry if the cap was hit.
    pub fn push(&mut self, message: ChatMessage) -> Option<ChatMessage> {
        self.entries.push_back(message);
        if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        }
    }

    /// Resolve a possibly-truncated message id to a position.
    ///
    /// An exact id match always wins. Otherwise the id is matched as a
    /// suffix or substring of the canonical ids, and must hit exactly one.
    pub fn resolve(&self, message_id: &str) -> Result<usize, LookupFailure> {
        if message_id.is_empty() {
            return Err(LookupFailure::NotFound);
        }

        if let Some(index) = self.entries.iter().position(|m| m.id == message_id) {
            return Ok(index);
        }

        let mut matches = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, m)| m.id.ends_with(message_id) || m.id.contains(message_id))
            .map(|(index, _)| index);

        match (matches.next(), matches.next()) {
            (Some(index), None) => Ok(index),
            (Some(_), Some(_)) => Err(LookupFailure::Ambiguous),
            (None, _) => Err(LookupFailure::NotFound),
        }
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ChatMessage> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ChatMessage> {
        self.entries.get_mut(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter()
    }

    /// Oldest-first copy of the history.
    #[must_use]
    pub fn to_vec(&self) -> Vec<ChatMessage> {
        self.entries.iter().cloned().collect()
    }
}
