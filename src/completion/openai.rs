//! OpenAI-compatible completion provider.
//!
//! Speaks `/chat/completions` for text, chat, and function calls, and
//! `/images/generations` for imagery. `base_url` may point at any compatible
//! endpoint.

use anyhow::{anyhow, Result};
use serde_json::{json, Value};

use super::{CompletionProvider, FunctionSpec, Message};

pub struct OpenAiProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    text_model: String,
    chat_model: String,
}

impl OpenAiProvider {
    pub fn new(config: &crate::config::CompletionConfig) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            text_model: config.text_model.clone(),
            chat_model: config.chat_model.clone(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn images_url(&self) -> String {
        format!("{}/images/generations", self.base_url)
    }

    fn post(&self, url: &str, payload: &Value) -> Result<Value> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(payload)
            .send()
            .map_err(|e| anyhow!("HTTP request failed: {e}"))?;

        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|e| anyhow!("failed to read response: {e}"))?;

        if !status.is_success() {
            let msg = body["error"]["message"]
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(anyhow!("completion API error: {msg}"));
        }
        Ok(body)
    }
}

impl CompletionProvider for OpenAiProvider {
    fn text_completion(&self, prompt: &str) -> Result<Option<String>> {
        let payload = chat_payload(&self.text_model, &[Message::user(prompt)], None, None);
        let body = self.post(&self.chat_url(), &payload)?;
        Ok(parse_message_content(&body))
    }

    fn chat_completion(&self, messages: &[Message]) -> Result<Option<String>> {
        let payload = chat_payload(&self.chat_model, messages, None, None);
        let body = self.post(&self.chat_url(), &payload)?;
        Ok(parse_message_content(&body))
    }

    fn function_completion(
        &self,
        prompt: &str,
        messages: &[Message],
        function: &FunctionSpec,
    ) -> Result<Option<Value>> {
        let payload = chat_payload(&self.chat_model, messages, Some(prompt), Some(function));
        let body = self.post(&self.chat_url(), &payload)?;
        Ok(parse_tool_arguments(&body))
    }

    fn generate_image(&self, prompt: &str, size: &str) -> Result<Option<String>> {
        let payload = json!({
            "prompt": prompt,
            "n": 1,
            "size": size,
        });
        let body = self.post(&self.images_url(), &payload)?;
        Ok(parse_image_url(&body))
    }
}

/// Build a `/chat/completions` payload. When `function` is given, the model is
/// forced to call exactly that tool.
fn chat_payload(
    model: &str,
    messages: &[Message],
    final_user_prompt: Option<&str>,
    function: Option<&FunctionSpec>,
) -> Value {
    let mut wire_messages: Vec<Value> = messages
        .iter()
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect();

    if let Some(prompt) = final_user_prompt {
        wire_messages.push(json!({ "role": "user", "content": prompt }));
    }

    let mut payload = json!({
        "model": model,
        "messages": wire_messages,
    });

    if let Some(f) = function {
        payload["tools"] = json!([{
            "type": "function",
            "function": {
                "name": f.name,
                "description": f.description,
                "parameters": f.parameters,
            }
        }]);
        payload["tool_choice"] = json!({
            "type": "function",
            "function": { "name": f.name }
        });
    }

    payload
}

/// Extract assistant text from a chat response. Empty strings count as absent.
fn parse_message_content(body: &Value) -> Option<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
}

/// Extract the first tool call's arguments as parsed JSON.
fn parse_tool_arguments(body: &Value) -> Option<Value> {
    let raw = body["choices"][0]["message"]["tool_calls"][0]["function"]["arguments"].as_str()?;
    serde_json::from_str(raw).ok()
}

/// Extract the first image URL from an `/images/generations` response.
fn parse_image_url(body: &Value) -> Option<String> {
    body["data"][0]["url"].as_str().map(|s| s.to_string())
}
