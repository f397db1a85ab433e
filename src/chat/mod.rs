//! Conversational chat over the dream journal.
//!
//! Two entry points: free-form [`ChatWorkflow::chat`] over an accumulated
//! per-user history, and [`ChatWorkflow::search_chat`], which grounds a
//! structured function call in the user's own dreams.

pub mod functions;
pub mod sessions;

use std::sync::Arc;

use serde::Serialize;

use crate::completion::{CompletionProvider, Message};
use crate::dreams::repo::DreamRepository;
use crate::dreams::types::Dream;
use crate::error::ChatError;
use sessions::ChatSessions;

/// Substituted when the caller sends an empty message.
const DEFAULT_MESSAGE: &str = "Let's talk about the fascinating world of lucid dreaming.";

/// Scene-setting system message prepended on every chat turn.
const SCENE_MESSAGE: &str = "Delve into the realm of dreams, drawing on scientific, \
psychological, philosophical, and mystical perspectives. Interpret dream imagery, \
unravel its symbolism, and relate it to the dreamer's waking life. When lucid \
dreaming comes up, cover induction techniques, benefits, challenges, and what \
lucidity says about consciousness. Keep each reply within 500 characters.";

/// How many search hits are injected as grounding context.
const GROUNDING_LIMIT: usize = 3;

/// Result of a grounded function-call chat.
///
/// `search_results` is always present, empty when nothing matched.
#[derive(Debug, Serialize)]
pub struct SearchChatResponse {
    pub function: String,
    pub arguments: serde_json::Value,
    pub search_results: Vec<Dream>,
}

pub struct ChatWorkflow {
    repo: DreamRepository,
    completion: Arc<dyn CompletionProvider>,
    sessions: Arc<ChatSessions>,
}

impl ChatWorkflow {
    pub fn new(
        repo: DreamRepository,
        completion: Arc<dyn CompletionProvider>,
        sessions: Arc<ChatSessions>,
    ) -> Self {
        Self {
            repo,
            completion,
            sessions,
        }
    }

    /// Free-form chat: append scene + user message, complete over the full
    /// history, record the reply (as a system-role message) and return it.
    pub fn chat(&self, message: &str, owner_email: &str) -> Result<String, ChatError> {
        let message = if message.trim().is_empty() {
            DEFAULT_MESSAGE
        } else {
            message
        };

        let history = self.sessions.append(
            owner_email,
            [Message::system(SCENE_MESSAGE), Message::user(message)],
        );

        let reply = self
            .completion
            .chat_completion(&history)
            .map_err(ChatError::Completion)?
            .ok_or(ChatError::EmptyReply)?;

        self.sessions.append(owner_email, [Message::system(&reply)]);
        tracing::info!(owner = %owner_email, turns = history.len() + 1, "chat reply produced");

        Ok(reply)
    }

    /// Grounded structured chat: search the owner's dreams, inject the top
    /// matches plus fixed meta-commentary into the history, then dispatch the
    /// prompt to the named function (or a random one if the name is unknown).
    pub fn search_chat(
        &self,
        function_name: &str,
        prompt: &str,
        owner_email: &str,
    ) -> Result<SearchChatResponse, ChatError> {
        let search_results = self.repo.search(prompt, owner_email)?;

        let mut grounding: Vec<Message> = Vec::new();
        for dream in search_results.iter().take(GROUNDING_LIMIT) {
            grounding.push(Message::system(format!(
                "A reverberation from your past dream, titled '{}', dated {}, has \
                 surfaced. The dream whispers: '{}'. It has been analyzed as: '{}'.",
                dream.title,
                dream.date,
                dream.entry,
                dream.analysis.as_deref().unwrap_or("Analysis not available"),
            )));
        }
        if search_results.is_empty() {
            grounding.push(Message::system(
                "The echoes of past dreams are silent. We venture into uncharted \
                 territory of the subconscious.",
            ));
        }
        grounding.push(Message::system(
            "As we tread this mindscape, reflect on how the dreamer feels about \
             the insights unraveled so far.",
        ));
        grounding.push(Message::system(format!(
            "To summarize the journey so far: {} past dreams sifted. What is the \
             next voyage?",
            search_results.len(),
        )));

        let history = self.sessions.append(owner_email, grounding);

        let function = functions::resolve_function(function_name);
        tracing::info!(
            owner = %owner_email,
            function = function.name,
            hits = search_results.len(),
            "dispatching search chat"
        );

        let arguments = self
            .completion
            .function_completion(prompt, &history, &function)
            .map_err(ChatError::Completion)?
            .ok_or(ChatError::EmptyReply)?;

        self.sessions.append(owner_email, [Message::user(prompt)]);

        Ok(SearchChatResponse {
            function: function.name.to_string(),
            arguments,
            search_results,
        })
    }
}
