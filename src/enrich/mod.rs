//! Enrichment workflow: derive analysis text and imagery for stored dreams.
//!
//! Two independent, idempotent operations share one retry shape: call the
//! completion adapter, accept the first usable output, otherwise pause per
//! the injected [`RetryPolicy`] and reissue. Results are persisted back
//! through the repository with a partial update, and every failure (absent
//! dream, exhausted retries, adapter error, bad field) lands in the single
//! [`EnrichError`] vocabulary.

pub mod prompts;
pub mod retry;

use std::sync::Arc;

use serde_json::Value;

use crate::completion::CompletionProvider;
use crate::dreams::repo::DreamRepository;
use crate::dreams::types::{Dream, DreamPatch};
use crate::error::{EnrichError, RepoError};
use prompts::{ImageQuality, ImageStyle, IntelligenceLevel};
use retry::RetryPolicy;

/// Behavior knobs for the enrichment loops.
pub struct EnrichOptions {
    /// Regenerate even when the dream already carries analysis/imagery.
    pub force_regenerate: bool,
    pub intelligence: IntelligenceLevel,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            force_regenerate: true,
            intelligence: IntelligenceLevel::General,
        }
    }
}

pub struct Enricher {
    repo: DreamRepository,
    completion: Arc<dyn CompletionProvider>,
    retry: Box<dyn RetryPolicy>,
    options: EnrichOptions,
}

impl Enricher {
    pub fn new(
        repo: DreamRepository,
        completion: Arc<dyn CompletionProvider>,
        retry: Box<dyn RetryPolicy>,
        options: EnrichOptions,
    ) -> Self {
        Self {
            repo,
            completion,
            retry,
            options,
        }
    }

    /// Produce (and persist) analysis text for a dream.
    ///
    /// With `force_regenerate` off, an existing non-empty analysis is
    /// returned as-is without touching the adapter.
    pub fn ensure_analysis(&self, dream_id: &str) -> Result<String, EnrichError> {
        let dream = self
            .repo
            .get(dream_id)?
            .ok_or_else(|| EnrichError::NotFound(dream_id.to_string()))?;

        if !self.options.force_regenerate {
            if let Some(existing) = dream.analysis.as_deref().filter(|a| !a.trim().is_empty()) {
                tracing::info!(id = %dream_id, "reusing stored analysis");
                return Ok(existing.to_string());
            }
        }

        let prompt = prompts::analysis_prompt(&dream.entry, self.options.intelligence);

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.completion.text_completion(&prompt) {
                Ok(Some(text)) => {
                    self.update_enrichment(dream_id, Some(Value::String(text.clone())), None)?;
                    tracing::info!(id = %dream_id, attempt, "analysis generated");
                    return Ok(text);
                }
                Ok(None) => {
                    tracing::warn!(id = %dream_id, attempt, "empty analysis response");
                }
                Err(e) => {
                    tracing::error!(id = %dream_id, attempt, error = %e, "analysis completion failed");
                    return Err(EnrichError::Adapter(e));
                }
            }

            match self.retry.delay_after(attempt) {
                Some(delay) => std::thread::sleep(delay),
                None => {
                    tracing::error!(id = %dream_id, attempts = attempt, "analysis retries exhausted");
                    return Err(EnrichError::Exhausted {
                        what: "analysis",
                        attempts: attempt,
                    });
                }
            }
        }
    }

    /// Produce (and persist) an image URL for a dream.
    ///
    /// The generation call takes the owner's full dream list plus the target
    /// id and locates the dream inside the list itself — the adapter's
    /// calling convention, kept for compatibility. Each attempt re-derives
    /// the summary and reissues the request; nothing is cached across
    /// attempts.
    pub fn ensure_image(
        &self,
        dream_id: &str,
        style: ImageStyle,
        quality: ImageQuality,
    ) -> Result<String, EnrichError> {
        let dream = self
            .repo
            .get(dream_id)?
            .ok_or_else(|| EnrichError::NotFound(dream_id.to_string()))?;

        if !self.options.force_regenerate {
            if let Some(existing) = dream.image.as_deref().filter(|u| !u.trim().is_empty()) {
                tracing::info!(id = %dream_id, "reusing stored image");
                return Ok(existing.to_string());
            }
        }

        let dreams = self.repo.list_by_owner(&dream.owner_email)?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.generate_image_once(&dreams, dream_id, style, quality) {
                Ok(Some(url)) => {
                    self.update_enrichment(dream_id, None, Some(Value::String(url.clone())))?;
                    tracing::info!(id = %dream_id, attempt, "image generated");
                    return Ok(url);
                }
                Ok(None) => {
                    tracing::warn!(id = %dream_id, attempt, "no image in response");
                }
                Err(e) => {
                    tracing::error!(id = %dream_id, attempt, error = %e, "image generation failed");
                    return Err(e);
                }
            }

            match self.retry.delay_after(attempt) {
                Some(delay) => std::thread::sleep(delay),
                None => {
                    tracing::error!(id = %dream_id, attempts = attempt, "image retries exhausted");
                    return Err(EnrichError::Exhausted {
                        what: "image",
                        attempts: attempt,
                    });
                }
            }
        }
    }

    /// One generation attempt: locate the dream in the provided list, derive
    /// a summary, compose the prompt, issue a single image request.
    fn generate_image_once(
        &self,
        dreams: &[Dream],
        dream_id: &str,
        style: ImageStyle,
        quality: ImageQuality,
    ) -> Result<Option<String>, EnrichError> {
        let Some(dream) = dreams.iter().find(|d| d.id == dream_id) else {
            tracing::warn!(id = %dream_id, "dream not in the provided list");
            return Err(EnrichError::NotFound(dream_id.to_string()));
        };

        let summary = match self
            .completion
            .text_completion(&prompts::summary_prompt(&dream.entry))
            .map_err(EnrichError::Adapter)?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        let prompt = prompts::image_prompt(style, &summary);
        tracing::debug!(id = %dream_id, style = style.as_str(), quality = quality.as_str(), "image prompt composed");

        self.completion
            .generate_image(&prompt, quality.resolution())
            .map_err(EnrichError::Adapter)
    }

    /// Persist enrichment fields through the repository's partial update,
    /// translating its outcomes into the workflow's failure vocabulary.
    pub fn update_enrichment(
        &self,
        dream_id: &str,
        analysis: Option<Value>,
        image: Option<Value>,
    ) -> Result<Dream, EnrichError> {
        let patch = DreamPatch { analysis, image };
        match self.repo.update(dream_id, &patch) {
            Ok(Some(dream)) => Ok(dream),
            Ok(None) => Err(EnrichError::NotFound(dream_id.to_string())),
            Err(RepoError::InvalidField(field)) => Err(EnrichError::InvalidField(field)),
            Err(RepoError::Store(e)) => Err(EnrichError::Store(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{FunctionSpec, Message};
    use crate::db;
    use crate::embedding::{EmbeddingProvider, EMBEDDING_DIM};
    use crate::store::sqlite::SqliteStore;
    use super::retry::FixedDelay;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct SpikeEmbedder;

    impl EmbeddingProvider for SpikeEmbedder {
        fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            let mut v = vec![0.0f32; EMBEDDING_DIM];
            let spike = text.bytes().map(|b| b as usize).sum::<usize>() % EMBEDDING_DIM;
            v[spike] = 1.0;
            Ok(v)
        }
    }

    /// Scripted completion stub counting adapter calls.
    struct StubCompletion {
        text_reply: Option<String>,
        image_reply: Option<String>,
        text_calls: AtomicU32,
        image_calls: AtomicU32,
    }

    impl StubCompletion {
        fn new(text_reply: Option<&str>, image_reply: Option<&str>) -> Self {
            Self {
                text_reply: text_reply.map(|s| s.to_string()),
                image_reply: image_reply.map(|s| s.to_string()),
                text_calls: AtomicU32::new(0),
                image_calls: AtomicU32::new(0),
            }
        }
    }

    impl CompletionProvider for StubCompletion {
        fn text_completion(&self, _prompt: &str) -> anyhow::Result<Option<String>> {
            self.text_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text_reply.clone())
        }

        fn chat_completion(&self, _messages: &[Message]) -> anyhow::Result<Option<String>> {
            Ok(self.text_reply.clone())
        }

        fn function_completion(
            &self,
            _prompt: &str,
            _messages: &[Message],
            _function: &FunctionSpec,
        ) -> anyhow::Result<Option<Value>> {
            Ok(None)
        }

        fn generate_image(&self, _prompt: &str, _size: &str) -> anyhow::Result<Option<String>> {
            self.image_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.image_reply.clone())
        }
    }

    fn test_repo() -> DreamRepository {
        let conn = db::open_memory_database().unwrap();
        let store = SqliteStore::new(conn, Arc::new(SpikeEmbedder));
        DreamRepository::new(Arc::new(store))
    }

    fn enricher(
        repo: DreamRepository,
        completion: Arc<StubCompletion>,
        max_attempts: u32,
        options: EnrichOptions,
    ) -> Enricher {
        Enricher::new(
            repo,
            completion,
            Box::new(FixedDelay::new(max_attempts, Duration::ZERO)),
            options,
        )
    }

    #[test]
    fn analysis_success_persists_and_returns() {
        let repo = test_repo();
        let dream = repo
            .create("T", "2026-01-01", "a vivid dream", "a@example.com")
            .unwrap();

        let stub = Arc::new(StubCompletion::new(Some("the analysis"), None));
        let e = enricher(repo.clone(), stub.clone(), 5, EnrichOptions::default());

        let analysis = e.ensure_analysis(&dream.id).unwrap();
        assert_eq!(analysis, "the analysis");
        assert_eq!(stub.text_calls.load(Ordering::SeqCst), 1);

        // Persisted through the repository
        let stored = repo.get(&dream.id).unwrap().unwrap();
        assert_eq!(stored.analysis.as_deref(), Some("the analysis"));
    }

    #[test]
    fn analysis_exhausts_after_single_attempt() {
        let repo = test_repo();
        let dream = repo
            .create("T", "2026-01-01", "entry", "a@example.com")
            .unwrap();

        let stub = Arc::new(StubCompletion::new(None, None));
        let e = enricher(repo, stub.clone(), 1, EnrichOptions::default());

        let err = e.ensure_analysis(&dream.id).unwrap_err();
        assert!(matches!(
            err,
            EnrichError::Exhausted { what: "analysis", attempts: 1 }
        ));
        // Adapter called exactly once, no sleeps taken
        assert_eq!(stub.text_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn analysis_absent_dream_is_not_found() {
        let repo = test_repo();
        let stub = Arc::new(StubCompletion::new(Some("x"), None));
        let e = enricher(repo, stub.clone(), 5, EnrichOptions::default());

        let err = e.ensure_analysis("no-such-id").unwrap_err();
        assert!(matches!(err, EnrichError::NotFound(_)));
        assert_eq!(stub.text_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn analysis_reuses_cached_value_when_not_forced() {
        let repo = test_repo();
        let dream = repo
            .create("T", "2026-01-01", "entry", "a@example.com")
            .unwrap();
        repo.update(
            &dream.id,
            &DreamPatch {
                analysis: Some(Value::String("cached".into())),
                image: None,
            },
        )
        .unwrap();

        let stub = Arc::new(StubCompletion::new(Some("fresh"), None));
        let options = EnrichOptions {
            force_regenerate: false,
            ..EnrichOptions::default()
        };
        let e = enricher(repo, stub.clone(), 5, options);

        assert_eq!(e.ensure_analysis(&dream.id).unwrap(), "cached");
        assert_eq!(stub.text_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn analysis_regenerates_over_cache_by_default() {
        let repo = test_repo();
        let dream = repo
            .create("T", "2026-01-01", "entry", "a@example.com")
            .unwrap();
        repo.update(
            &dream.id,
            &DreamPatch {
                analysis: Some(Value::String("cached".into())),
                image: None,
            },
        )
        .unwrap();

        let stub = Arc::new(StubCompletion::new(Some("fresh"), None));
        let e = enricher(repo, stub.clone(), 5, EnrichOptions::default());

        assert_eq!(e.ensure_analysis(&dream.id).unwrap(), "fresh");
        assert_eq!(stub.text_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn image_success_persists_url() {
        let repo = test_repo();
        let dream = repo
            .create("T", "2026-01-01", "entry", "a@example.com")
            .unwrap();

        let stub = Arc::new(StubCompletion::new(
            Some("a short summary"),
            Some("https://img.example.com/d.png"),
        ));
        let e = enricher(repo.clone(), stub.clone(), 5, EnrichOptions::default());

        let url = e
            .ensure_image(&dream.id, ImageStyle::Renaissance, ImageQuality::Low)
            .unwrap();
        assert_eq!(url, "https://img.example.com/d.png");
        assert_eq!(stub.image_calls.load(Ordering::SeqCst), 1);

        let stored = repo.get(&dream.id).unwrap().unwrap();
        assert_eq!(stored.image.as_deref(), Some("https://img.example.com/d.png"));
    }

    #[test]
    fn image_exhausts_when_no_image_comes_back() {
        let repo = test_repo();
        let dream = repo
            .create("T", "2026-01-01", "entry", "a@example.com")
            .unwrap();

        let stub = Arc::new(StubCompletion::new(Some("summary"), None));
        let e = enricher(repo, stub.clone(), 3, EnrichOptions::default());

        let err = e
            .ensure_image(&dream.id, ImageStyle::Modern, ImageQuality::High)
            .unwrap_err();
        assert!(matches!(
            err,
            EnrichError::Exhausted { what: "image", attempts: 3 }
        ));
        // One image call per attempt — regenerated each time, not cached
        assert_eq!(stub.image_calls.load(Ordering::SeqCst), 3);
        assert_eq!(stub.text_calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn image_fails_fast_when_dream_missing_from_list() {
        let repo = test_repo();
        let dream = repo
            .create("T", "2026-01-01", "entry", "a@example.com")
            .unwrap();

        let stub = Arc::new(StubCompletion::new(Some("summary"), Some("url")));
        let e = enricher(repo, stub.clone(), 5, EnrichOptions::default());

        let err = e
            .generate_image_once(&[], &dream.id, ImageStyle::Renaissance, ImageQuality::Low)
            .unwrap_err();
        assert!(matches!(err, EnrichError::NotFound(_)));
        // No adapter calls — the list lookup gates summarization
        assert_eq!(stub.text_calls.load(Ordering::SeqCst), 0);
        assert_eq!(stub.image_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn update_enrichment_translates_repo_outcomes() {
        let repo = test_repo();
        let dream = repo
            .create("T", "2026-01-01", "entry", "a@example.com")
            .unwrap();
        let stub = Arc::new(StubCompletion::new(None, None));
        let e = enricher(repo, stub, 5, EnrichOptions::default());

        let updated = e
            .update_enrichment(&dream.id, Some(Value::String("a".into())), None)
            .unwrap();
        assert_eq!(updated.analysis.as_deref(), Some("a"));

        let err = e
            .update_enrichment("no-such-id", Some(Value::String("a".into())), None)
            .unwrap_err();
        assert!(matches!(err, EnrichError::NotFound(_)));

        let err = e
            .update_enrichment(&dream.id, Some(Value::Bool(true)), None)
            .unwrap_err();
        assert!(matches!(err, EnrichError::InvalidField("analysis")));
    }
}
