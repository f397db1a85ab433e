#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use oneiro::completion::{CompletionProvider, FunctionSpec, Message};
use oneiro::db;
use oneiro::dreams::repo::DreamRepository;
use oneiro::embedding::{EmbeddingProvider, EMBEDDING_DIM};
use oneiro::enrich::retry::FixedDelay;
use oneiro::enrich::{EnrichOptions, Enricher};
use oneiro::store::sqlite::SqliteStore;

/// Deterministic embedder: a unit spike at a position derived from the text.
/// Distinct texts land on distinct-ish dimensions; no network involved.
pub struct SpikeEmbedder;

impl EmbeddingProvider for SpikeEmbedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut v = vec![0.0f32; EMBEDDING_DIM];
        let spike = text.bytes().map(|b| b as usize).sum::<usize>() % EMBEDDING_DIM;
        v[spike] = 1.0;
        Ok(v)
    }
}

/// Fresh in-memory repository over a SQLite store and the spike embedder.
pub fn test_repo() -> DreamRepository {
    let conn = db::open_memory_database().unwrap();
    let store = SqliteStore::new(conn, Arc::new(SpikeEmbedder));
    DreamRepository::new(Arc::new(store))
}

/// Scripted completion adapter with call counters.
///
/// `text_replies` is consumed front to back; when it runs out the last entry
/// repeats (so `vec![None]` means "always empty").
pub struct ScriptedCompletion {
    text_replies: Vec<Option<String>>,
    image_reply: Option<String>,
    function_args: Option<serde_json::Value>,
    pub text_calls: AtomicU32,
    pub image_calls: AtomicU32,
    pub function_calls: AtomicU32,
}

impl ScriptedCompletion {
    pub fn always_empty() -> Self {
        Self::new(vec![None], None, None)
    }

    pub fn with_text(reply: &str) -> Self {
        Self::new(vec![Some(reply.to_string())], None, None)
    }

    pub fn new(
        text_replies: Vec<Option<String>>,
        image_reply: Option<String>,
        function_args: Option<serde_json::Value>,
    ) -> Self {
        Self {
            text_replies,
            image_reply,
            function_args,
            text_calls: AtomicU32::new(0),
            image_calls: AtomicU32::new(0),
            function_calls: AtomicU32::new(0),
        }
    }

    fn next_text(&self, call_index: u32) -> Option<String> {
        let idx = (call_index as usize).min(self.text_replies.len().saturating_sub(1));
        self.text_replies.get(idx).cloned().flatten()
    }
}

impl CompletionProvider for ScriptedCompletion {
    fn text_completion(&self, _prompt: &str) -> anyhow::Result<Option<String>> {
        let call = self.text_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_text(call))
    }

    fn chat_completion(&self, _messages: &[Message]) -> anyhow::Result<Option<String>> {
        let call = self.text_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_text(call))
    }

    fn function_completion(
        &self,
        _prompt: &str,
        _messages: &[Message],
        _function: &FunctionSpec,
    ) -> anyhow::Result<Option<serde_json::Value>> {
        self.function_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.function_args.clone())
    }

    fn generate_image(&self, _prompt: &str, _size: &str) -> anyhow::Result<Option<String>> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.image_reply.clone())
    }
}

/// Enricher over `repo` with a zero-delay retry policy.
pub fn test_enricher(
    repo: DreamRepository,
    completion: Arc<ScriptedCompletion>,
    max_attempts: u32,
    force_regenerate: bool,
) -> Enricher {
    Enricher::new(
        repo,
        completion,
        Box::new(FixedDelay::new(max_attempts, Duration::ZERO)),
        EnrichOptions {
            force_regenerate,
            ..EnrichOptions::default()
        },
    )
}
