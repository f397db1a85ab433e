//! Per-user conversation history.
//!
//! Process-local cache keyed by owner email; nothing survives a restart.
//! Injected into the chat workflow rather than held as global state, with a
//! per-user message cap as the eviction policy.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::completion::Message;

pub struct ChatSessions {
    histories: Mutex<HashMap<String, Vec<Message>>>,
    /// Per-user cap; the oldest messages are evicted past it.
    limit: usize,
}

impl ChatSessions {
    pub fn new(limit: usize) -> Self {
        Self {
            histories: Mutex::new(HashMap::new()),
            limit,
        }
    }

    /// Append messages to an owner's history and return a snapshot of the
    /// history after the append.
    pub fn append(
        &self,
        owner_email: &str,
        messages: impl IntoIterator<Item = Message>,
    ) -> Vec<Message> {
        let mut histories = self.histories.lock().unwrap_or_else(|e| e.into_inner());
        let history = histories.entry(owner_email.to_string()).or_default();
        history.extend(messages);

        if history.len() > self.limit {
            let excess = history.len() - self.limit;
            history.drain(..excess);
            tracing::debug!(owner = %owner_email, evicted = excess, "chat history trimmed");
        }

        history.clone()
    }

    /// Current snapshot of an owner's history (empty if none).
    pub fn snapshot(&self, owner_email: &str) -> Vec<Message> {
        let histories = self.histories.lock().unwrap_or_else(|e| e.into_inner());
        histories.get(owner_email).cloned().unwrap_or_default()
    }
}
