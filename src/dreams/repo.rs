//! Owner-scoped CRUD and search over dream records.
//!
//! Every read that can return foreign records filters by owner email after
//! the store call; the store itself knows nothing about ownership. Absence is
//! always a value (`Ok(None)`, `false`), never an error.

use std::sync::Arc;

use serde_json::Value;

use crate::dreams::types::{Dream, DreamPatch};
use crate::error::{RepoError, StoreError};
use crate::store::MemoryStore;

/// Store category all dream records live under.
const CATEGORY: &str = "dreams";

/// Page size for the full-list scan.
const LIST_PAGE: usize = 2222;

/// Candidate bound handed to the store's similarity search.
const SEARCH_CANDIDATES: usize = 100;

#[derive(Clone)]
pub struct DreamRepository {
    store: Arc<dyn MemoryStore>,
}

impl DreamRepository {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }

    /// Create a dream owned by `owner_email`. The store assigns the id.
    ///
    /// Store failures propagate; creation has no partial outcome.
    pub fn create(
        &self,
        title: &str,
        date: &str,
        entry: &str,
        owner_email: &str,
    ) -> Result<Dream, RepoError> {
        let document = Dream::document(title, entry);
        let metadata = Dream::initial_metadata(title, date, entry, owner_email);

        let record = self.store.create(CATEGORY, &document, metadata)?;
        tracing::info!(id = %record.id, owner = %owner_email, "dream created");

        Dream::from_record(&record)
            .ok_or_else(|| RepoError::Store(StoreError::Refused {
                operation: "create",
                id: record.id,
            }))
    }

    /// Fetch a dream by id. `Ok(None)` is the normal absent outcome.
    pub fn get(&self, id: &str) -> Result<Option<Dream>, StoreError> {
        let record = self.store.get(CATEGORY, id)?;
        Ok(record.as_ref().and_then(Dream::from_record))
    }

    /// All dreams owned by `owner_email`.
    ///
    /// Scans a bounded page and filters client-side.
    /// TODO: push the owner filter into the store query once the adapter
    /// grows metadata filtering.
    pub fn list_by_owner(&self, owner_email: &str) -> Result<Vec<Dream>, StoreError> {
        let records = self.store.list(CATEGORY, LIST_PAGE)?;
        let dreams = records
            .iter()
            .filter_map(Dream::from_record)
            .filter(|d| d.owner_email == owner_email)
            .collect();
        Ok(dreams)
    }

    /// Free-text search over the owner's dreams.
    ///
    /// Ranking is the store's; only the owner filter is applied here.
    pub fn search(&self, keyword: &str, owner_email: &str) -> Result<Vec<Dream>, StoreError> {
        let records = self.store.search(CATEGORY, keyword, SEARCH_CANDIDATES)?;
        let dreams: Vec<Dream> = records
            .iter()
            .filter_map(Dream::from_record)
            .filter(|d| d.owner_email == owner_email)
            .collect();
        tracing::info!(keyword, owner = %owner_email, hits = dreams.len(), "dream search");
        Ok(dreams)
    }

    /// Merge the supplied fields into a dream's metadata.
    ///
    /// `Ok(None)` when the dream does not exist. A supplied non-string value
    /// is rejected with `InvalidField` and nothing is written. An empty patch
    /// writes nothing and returns the unchanged dream.
    pub fn update(&self, id: &str, patch: &DreamPatch) -> Result<Option<Dream>, RepoError> {
        let Some(record) = self.store.get(CATEGORY, id)? else {
            return Ok(None);
        };

        // Validate before touching anything
        for (field, value) in patch.fields() {
            if let Some(v) = value {
                if !v.is_string() {
                    return Err(RepoError::InvalidField(field));
                }
            }
        }

        if patch.is_empty() {
            return Ok(Dream::from_record(&record));
        }

        let mut metadata = record.metadata.clone();
        for (field, value) in patch.fields() {
            if let Some(Value::String(s)) = value {
                metadata.insert(field.to_string(), Value::String(s.clone()));
            }
        }

        self.store.update_metadata(CATEGORY, id, metadata.clone())?;
        tracing::info!(id, "dream enrichment updated");

        let merged = crate::store::Record {
            metadata,
            ..record
        };
        Ok(Dream::from_record(&merged))
    }

    /// Delete a dream. `false` when it does not exist, and also when the
    /// store refuses; refusal is logged but never surfaced as an error.
    pub fn delete(&self, id: &str) -> bool {
        match self.store.delete(CATEGORY, id) {
            Ok(true) => {
                tracing::info!(id, "dream deleted");
                true
            }
            Ok(false) => {
                tracing::warn!(id, "delete requested for absent dream");
                false
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "store refused delete");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::embedding::{EmbeddingProvider, EMBEDDING_DIM};
    use crate::store::sqlite::SqliteStore;

    /// Deterministic embedder: a unit spike at a position derived from the text.
    struct SpikeEmbedder;

    impl EmbeddingProvider for SpikeEmbedder {
        fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            let mut v = vec![0.0f32; EMBEDDING_DIM];
            let spike = text.bytes().map(|b| b as usize).sum::<usize>() % EMBEDDING_DIM;
            v[spike] = 1.0;
            Ok(v)
        }
    }

    fn test_repo() -> DreamRepository {
        let conn = db::open_memory_database().unwrap();
        let store = SqliteStore::new(conn, Arc::new(SpikeEmbedder));
        DreamRepository::new(Arc::new(store))
    }

    #[test]
    fn create_and_get_round_trip() {
        let repo = test_repo();
        let dream = repo
            .create(
                "Test Dream",
                "2021-10-10",
                "A dream about testing",
                "test@example.com",
            )
            .unwrap();

        assert!(!dream.id.is_empty());

        let fetched = repo.get(&dream.id).unwrap().unwrap();
        assert_eq!(fetched.title, "Test Dream");
        assert_eq!(fetched.date, "2021-10-10");
        assert_eq!(fetched.entry, "A dream about testing");
        assert_eq!(fetched.owner_email, "test@example.com");
        assert!(fetched.analysis.is_none());
        assert!(fetched.image.is_none());
    }

    #[test]
    fn list_by_owner_scopes_to_owner() {
        let repo = test_repo();
        let mine = repo
            .create("Mine", "2026-01-01", "my dream", "a@example.com")
            .unwrap();
        repo.create("Theirs", "2026-01-02", "their dream", "b@example.com")
            .unwrap();

        let a_dreams = repo.list_by_owner("a@example.com").unwrap();
        assert_eq!(a_dreams.len(), 1);
        assert_eq!(a_dreams[0].id, mine.id);

        let b_dreams = repo.list_by_owner("b@example.com").unwrap();
        assert_eq!(b_dreams.len(), 1);
        assert!(b_dreams.iter().all(|d| d.id != mine.id));
    }

    #[test]
    fn search_never_leaks_foreign_dreams() {
        let repo = test_repo();
        repo.create("Ocean", "2026-01-01", "waves on a silver shore", "a@example.com")
            .unwrap();
        repo.create("Ocean too", "2026-01-02", "waves on a silver shore", "b@example.com")
            .unwrap();

        let results = repo.search("silver shore waves", "a@example.com").unwrap();
        assert!(!results.is_empty());
        assert!(results.iter().all(|d| d.owner_email == "a@example.com"));
    }

    #[test]
    fn update_merges_only_supplied_fields() {
        let repo = test_repo();
        let dream = repo
            .create("T", "2026-01-01", "entry text", "a@example.com")
            .unwrap();

        let patch = DreamPatch {
            analysis: Some(Value::String("an analysis".into())),
            image: None,
        };
        let updated = repo.update(&dream.id, &patch).unwrap().unwrap();
        assert_eq!(updated.analysis.as_deref(), Some("an analysis"));
        assert!(updated.image.is_none());
        // Immutable fields preserved
        assert_eq!(updated.title, "T");
        assert_eq!(updated.owner_email, "a@example.com");

        // Second partial update preserves the first
        let patch = DreamPatch {
            analysis: None,
            image: Some(Value::String("https://img.example.com/x.png".into())),
        };
        let updated = repo.update(&dream.id, &patch).unwrap().unwrap();
        assert_eq!(updated.analysis.as_deref(), Some("an analysis"));
        assert_eq!(updated.image.as_deref(), Some("https://img.example.com/x.png"));
    }

    #[test]
    fn empty_update_is_a_no_op() {
        let repo = test_repo();
        let dream = repo
            .create("T", "2026-01-01", "entry", "a@example.com")
            .unwrap();

        let before = repo.get(&dream.id).unwrap().unwrap();
        let returned = repo.update(&dream.id, &DreamPatch::default()).unwrap().unwrap();
        let returned_again = repo.update(&dream.id, &DreamPatch::default()).unwrap().unwrap();
        let after = repo.get(&dream.id).unwrap().unwrap();

        let as_json = |d: &Dream| serde_json::to_string(d).unwrap();
        assert_eq!(as_json(&before), as_json(&returned));
        assert_eq!(as_json(&before), as_json(&returned_again));
        assert_eq!(as_json(&before), as_json(&after));
    }

    #[test]
    fn update_rejects_non_string_analysis() {
        let repo = test_repo();
        let dream = repo
            .create("T", "2026-01-01", "entry", "a@example.com")
            .unwrap();

        let patch = DreamPatch {
            analysis: Some(Value::Number(123.into())),
            image: None,
        };
        let err = repo.update(&dream.id, &patch).unwrap_err();
        assert!(matches!(err, RepoError::InvalidField("analysis")));

        // Nothing was written
        let fetched = repo.get(&dream.id).unwrap().unwrap();
        assert!(fetched.analysis.is_none());
    }

    #[test]
    fn update_absent_dream_returns_none() {
        let repo = test_repo();
        let patch = DreamPatch {
            analysis: Some(Value::String("a".into())),
            image: None,
        };
        assert!(repo.update("no-such-id", &patch).unwrap().is_none());
    }

    #[test]
    fn delete_then_get_returns_none_and_double_delete_is_false() {
        let repo = test_repo();
        let dream = repo
            .create("T", "2026-01-01", "entry", "a@example.com")
            .unwrap();

        assert!(repo.delete(&dream.id));
        assert!(repo.get(&dream.id).unwrap().is_none());
        assert!(!repo.delete(&dream.id));
    }
}
