//! Rolling conversation history shown by the chat shell and the HTTP API.

use std::collections::VecDeque;

use chrono::Utc;

use crate::models::ConversationEntry;

/// The last `capacity` question/answer pairs, oldest first.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    entries: VecDeque<ConversationEntry>,
    capacity: usize,
}

impl ConversationHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an exchange, evicting the oldest entry when full.
    pub fn push(&mut self, query: impl Into<String>, response: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(ConversationEntry {
            query: query.into(),
            response: response.into(),
            asked_at: Utc::now(),
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConversationEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<ConversationEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
