//! Ordered, append-only history of a chat session.
//!
//! Display order is local append order: outgoing messages are appended the
//! moment they are sent, incoming ones the moment they arrive.  There is no
//! reordering by timestamp and no deduplication.

use super::message::ChatMessage;

/// In-memory message history.  Entries can be added but never removed.
#[derive(Debug, Default, Clone)]
pub struct MessageLog {
    entries: Vec<ChatMessage>,
}

impl MessageLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `message` and returns its zero-based position.
    pub fn push(&mut self, message: ChatMessage) -> usize {
        self.entries.push(message);
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the message at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&ChatMessage> {
        self.entries.get(index)
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.entries.last()
    }

    /// Iterates messages in append order.
    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter()
    }
}
