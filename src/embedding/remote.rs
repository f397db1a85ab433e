//! Remote embedding provider over an OpenAI-compatible `/embeddings` endpoint.

use anyhow::{anyhow, Result};
use serde_json::{json, Value};

use super::{EmbeddingProvider, EMBEDDING_DIM};

pub struct RemoteEmbeddingProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl RemoteEmbeddingProvider {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    fn url(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }
}

impl EmbeddingProvider for RemoteEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let payload = json!({
            "model": self.model,
            "input": text,
        });

        let response = self
            .client
            .post(self.url())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .map_err(|e| anyhow!("embeddings request failed: {e}"))?;

        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|e| anyhow!("failed to read embeddings response: {e}"))?;

        if !status.is_success() {
            let msg = body["error"]["message"]
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(anyhow!("embeddings error: {msg}"));
        }

        let values = body["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| anyhow!("embeddings response carried no vector"))?;

        let vector: Vec<f32> = values
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();

        if vector.len() != EMBEDDING_DIM {
            return Err(anyhow!(
                "expected {EMBEDDING_DIM}-dim embedding, got {}",
                vector.len()
            ));
        }

        Ok(vector)
    }
}
