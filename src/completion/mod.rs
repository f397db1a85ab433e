//! Text, chat, function-call, and image completion.
//!
//! Provides the [`CompletionProvider`] trait and an OpenAI-compatible
//! implementation. Absent output is `Ok(None)`: an upstream response with no
//! usable text or image is a normal outcome that callers retry around, not an
//! error.

pub mod openai;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Role tag on a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One conversation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A named structured-output function the model can be steered into.
#[derive(Debug, Clone)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON Schema of the function's arguments.
    pub parameters: serde_json::Value,
}

/// Trait for completion backends.
///
/// All methods are synchronous — callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait CompletionProvider: Send + Sync {
    /// One-shot text completion. `Ok(None)` when the response carries no text.
    fn text_completion(&self, prompt: &str) -> Result<Option<String>>;

    /// Multi-turn chat completion over an accumulated history.
    fn chat_completion(&self, messages: &[Message]) -> Result<Option<String>>;

    /// Force a call to `function` and return its parsed arguments.
    fn function_completion(
        &self,
        prompt: &str,
        messages: &[Message],
        function: &FunctionSpec,
    ) -> Result<Option<serde_json::Value>>;

    /// Generate an image and return its URL. `Ok(None)` when the response
    /// carries no image.
    fn generate_image(&self, prompt: &str, size: &str) -> Result<Option<String>>;
}
