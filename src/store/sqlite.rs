//! SQLite-backed record store.
//!
//! Write path runs in a transaction: insert into `records`, sync the FTS5
//! index, insert the document embedding into the vec0 table. Search merges
//! vector KNN and FTS5 BM25 candidates via Reciprocal Rank Fusion and returns
//! records in merged-score order.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::embedding::EmbeddingProvider;
use crate::error::StoreError;
use crate::store::{embedding_to_bytes, MemoryStore, Record};

/// How many positions back in a ranked list still contribute RRF score.
const RRF_K: usize = 60;

pub struct SqliteStore {
    conn: Mutex<Connection>,
    embedding: Arc<dyn EmbeddingProvider>,
}

impl SqliteStore {
    pub fn new(conn: Connection, embedding: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            conn: Mutex::new(conn),
            embedding,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl MemoryStore for SqliteStore {
    fn create(
        &self,
        category: &str,
        document: &str,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Record, StoreError> {
        let embedding = self
            .embedding
            .embed(document)
            .map_err(StoreError::Embedding)?;

        let id = uuid::Uuid::now_v7().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let metadata_json = serde_json::to_string(&metadata)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO records (id, category, document, metadata, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id, category, document, metadata_json, now],
        )?;
        let rowid = tx.last_insert_rowid();

        // FTS5 external-content index shares the rowid with `records`
        tx.execute(
            "INSERT INTO records_fts (rowid, document, id, category) VALUES (?1, ?2, ?3, ?4)",
            params![rowid, document, id, category],
        )?;

        tx.execute(
            "INSERT INTO records_vec (id, embedding) VALUES (?1, ?2)",
            params![id, embedding_to_bytes(&embedding)],
        )?;

        tx.commit()?;

        tracing::info!(id = %id, category, "record stored");

        Ok(Record {
            id,
            category: category.to_string(),
            document: document.to_string(),
            metadata,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    fn get(&self, category: &str, id: &str) -> Result<Option<Record>, StoreError> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                "SELECT id, category, document, metadata, created_at, updated_at \
                 FROM records WHERE id = ?1 AND category = ?2",
                params![id, category],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn update_metadata(
        &self,
        category: &str,
        id: &str,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), StoreError> {
        let metadata_json = serde_json::to_string(&metadata)?;
        let now = chrono::Utc::now().to_rfc3339();

        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE records SET metadata = ?1, updated_at = ?2 WHERE id = ?3 AND category = ?4",
            params![metadata_json, now, id, category],
        )?;

        if rows == 0 {
            return Err(StoreError::Refused {
                operation: "update",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn delete(&self, category: &str, id: &str) -> Result<bool, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        // Fetch rowid and document for the FTS5 external-content delete
        let row: Option<(i64, String)> = tx
            .query_row(
                "SELECT rowid, document FROM records WHERE id = ?1 AND category = ?2",
                params![id, category],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((rowid, document)) = row else {
            return Ok(false);
        };

        tx.execute(
            "INSERT INTO records_fts(records_fts, rowid, document, id, category) \
             VALUES('delete', ?1, ?2, ?3, ?4)",
            params![rowid, document, id, category],
        )?;
        tx.execute("DELETE FROM records_vec WHERE id = ?1", params![id])?;
        tx.execute("DELETE FROM records WHERE id = ?1", params![id])?;

        tx.commit()?;

        tracing::info!(id = %id, category, "record deleted");
        Ok(true)
    }

    fn search(
        &self,
        category: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        let query_embedding = self
            .embedding
            .embed(query)
            .map_err(StoreError::Embedding)?;

        let conn = self.lock()?;

        // Over-fetch: vector candidates are category-filtered only after the merge
        let candidate_limit = limit * 3;
        let vec_results = vector_search(&conn, &query_embedding, candidate_limit)?;
        let fts_results = fts_search(&conn, category, query, candidate_limit)?;

        let merged = rrf_merge(&vec_results, &fts_results, RRF_K);

        let candidate_ids: Vec<&str> = merged.iter().map(|(id, _)| id.as_str()).collect();
        let records = fetch_records(&conn, category, &candidate_ids)?;

        let mut results = Vec::new();
        for (id, _score) in &merged {
            if let Some(record) = records.get(id.as_str()) {
                results.push(record.clone());
                if results.len() >= limit {
                    break;
                }
            }
        }
        Ok(results)
    }

    fn list(&self, category: &str, limit: usize) -> Result<Vec<Record>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, category, document, metadata, created_at, updated_at \
             FROM records WHERE category = ?1 ORDER BY created_at LIMIT ?2",
        )?;
        let records = stmt
            .query_map(params![category, limit as i64], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let metadata_str: String = row.get(3)?;
    Ok(Record {
        id: row.get(0)?,
        category: row.get(1)?,
        document: row.get(2)?,
        metadata: serde_json::from_str(&metadata_str).unwrap_or_default(),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Vector KNN search via sqlite-vec.
fn vector_search(
    conn: &Connection,
    embedding: &[f32],
    limit: usize,
) -> Result<Vec<(String, f64)>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, distance FROM records_vec \
         WHERE embedding MATCH ?1 ORDER BY distance LIMIT ?2",
    )?;
    let results = stmt
        .query_map(params![embedding_to_bytes(embedding), limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(results)
}

/// FTS5 BM25 keyword search, category-scoped.
fn fts_search(
    conn: &Connection,
    category: &str,
    query_text: &str,
    limit: usize,
) -> Result<Vec<(String, f64)>, StoreError> {
    let escaped = escape_fts_query(query_text);
    if escaped.is_empty() {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(
        "SELECT id, rank FROM records_fts \
         WHERE records_fts MATCH ?1 AND category = ?2 ORDER BY rank LIMIT ?3",
    )?;
    let results = stmt
        .query_map(params![escaped, category, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(results)
}

/// Escape a user query for FTS5 MATCH syntax.
///
/// Wraps each whitespace-delimited word in double quotes and joins with spaces
/// so FTS5 treats them as individual terms (implicit AND). Strips empty tokens.
fn escape_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| {
            let clean = word.replace('"', "");
            format!("\"{clean}\"")
        })
        .filter(|w| w != "\"\"")
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reciprocal Rank Fusion merge.
///
/// Documents appearing in both ranked lists get additive scores; those in only
/// one list get a single score.
fn rrf_merge(
    vec_results: &[(String, f64)],
    fts_results: &[(String, f64)],
    k: usize,
) -> Vec<(String, f64)> {
    let mut scores: HashMap<String, f64> = HashMap::new();

    for (rank, (id, _distance)) in vec_results.iter().enumerate() {
        *scores.entry(id.clone()).or_insert(0.0) += 1.0 / (k as f64 + rank as f64);
    }
    for (rank, (id, _rank_score)) in fts_results.iter().enumerate() {
        *scores.entry(id.clone()).or_insert(0.0) += 1.0 / (k as f64 + rank as f64);
    }

    let mut merged: Vec<(String, f64)> = scores.into_iter().collect();
    merged.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    merged
}

/// Batch-fetch records by id, category-filtered.
fn fetch_records(
    conn: &Connection,
    category: &str,
    ids: &[&str],
) -> Result<HashMap<String, Record>, StoreError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (2..=ids.len() + 1).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT id, category, document, metadata, created_at, updated_at \
         FROM records WHERE category = ?1 AND id IN ({})",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;

    let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&category];
    params.extend(ids.iter().map(|id| id as &dyn rusqlite::types::ToSql));

    let rows = stmt
        .query_map(params.as_slice(), row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut map = HashMap::new();
    for row in rows {
        map.insert(row.id.clone(), row);
    }
    Ok(map)
}
