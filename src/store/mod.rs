//! Memory store adapter.
//!
//! Records are the store's unit: an opaque id, a free-text document (indexed
//! for keyword and vector search), and a JSON metadata map. Higher layers own
//! the mapping between records and their domain shapes; the store owns
//! durability and ranking.

pub mod sqlite;

use serde::Serialize;

use crate::error::StoreError;

/// A stored record, as returned by every read operation.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub id: String,
    pub category: String,
    pub document: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// Category-scoped record storage with similarity search.
pub trait MemoryStore: Send + Sync {
    /// Store a new document. The id is assigned here and returned on the record.
    fn create(
        &self,
        category: &str,
        document: &str,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Record, StoreError>;

    /// Fetch a record by id. `Ok(None)` when absent.
    fn get(&self, category: &str, id: &str) -> Result<Option<Record>, StoreError>;

    /// Replace a record's metadata. The document and its indexes are untouched.
    fn update_metadata(
        &self,
        category: &str,
        id: &str,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), StoreError>;

    /// Delete a record. `Ok(false)` when it does not exist; `Err` when the
    /// store refuses to remove one that does.
    fn delete(&self, category: &str, id: &str) -> Result<bool, StoreError>;

    /// Similarity-ranked free-text search within a category.
    fn search(&self, category: &str, query: &str, limit: usize)
        -> Result<Vec<Record>, StoreError>;

    /// Bounded page of a category in creation order.
    fn list(&self, category: &str, limit: usize) -> Result<Vec<Record>, StoreError>;
}

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            embedding.len() * std::mem::size_of::<f32>(),
        )
    }
}
