//! Capped conversation history.

use serde::Serialize;

use super::message::ChatMessage;

/// Ordered, capped list of messages, oldest first.
///
/// Messages always arrive as user/assistant pairs, so the history alternates
/// and never holds more than `2 * max_exchanges` entries. Updates consume the
/// history and return the new one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    #[serde(skip)]
    max_exchanges: usize,
}

impl Conversation {
    /// Create an empty conversation keeping at most `max_exchanges` pairs.
    #[must_use]
    pub const fn new(max_exchanges: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_exchanges,
        }
    }

    /// Append one exchange, then evict the oldest pairs beyond the cap.
    #[must_use]
    pub fn with_exchange(mut self, user: ChatMessage, assistant: ChatMessage) -> Self {
        self.messages.push(user);
        self.messages.push(assistant);
        self.trim();
        self
    }

    fn trim(&mut self) {
        let cap = self.capacity();
        if self.messages.len() > cap {
            let excess = self.messages.len() - cap;
            // Round up so a pair is never split.
            let evict = excess + excess % 2;
            self.messages.drain(..evict);
        }
    }

    /// Maximum number of stored messages.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.max_exchanges.saturating_mul(2)
    }

    /// Messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of stored messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been said yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
