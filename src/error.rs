//! Error taxonomy shared across the crate.
//!
//! Each layer gets its own `thiserror` enum so callers pattern-match one
//! vocabulary per operation instead of branching on mixed sentinels.
//! "Absent" outcomes are values (`Ok(None)`, `Ok(false)`), never errors;
//! only genuine failures live here.

use thiserror::Error;

/// Failures inside the memory store adapter.
///
/// `Refused` is an explicit refusal signal from the store, distinct from
/// absence: `delete` returns `Ok(false)` when a record does not exist and
/// `Err(Refused)` when the store declined to remove one that does.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("metadata encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("store refused to {operation} record {id}")]
    Refused {
        operation: &'static str,
        id: String,
    },
}

/// Failures from the dream repository.
///
/// NotFound is not here: `get` and `update` return `Ok(None)` for an absent
/// dream, which callers treat as a normal outcome.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("field `{0}` must be a string")]
    InvalidField(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The single failure vocabulary of the enrichment workflow.
///
/// Generation and persistence failures collapse into this one enum so
/// callers of `ensure_analysis` / `ensure_image` / `update_enrichment`
/// match on the same shapes.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("dream not found: {0}")]
    NotFound(String),

    #[error("no usable {what} after {attempts} attempts")]
    Exhausted { what: &'static str, attempts: u32 },

    #[error("completion adapter failed: {0}")]
    Adapter(#[source] anyhow::Error),

    #[error("field `{0}` must be a string")]
    InvalidField(&'static str),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Failures from the chat workflow.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("completion failed: {0}")]
    Completion(#[source] anyhow::Error),

    #[error("completion returned no usable reply")]
    EmptyReply,

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Identity token verification failures. All of these map to HTTP 401.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid identity token: {0}")]
    InvalidToken(String),

    #[error("no key in the key set matches kid `{0}`")]
    UnknownKey(String),

    #[error("token has no email claim")]
    MissingEmail,

    #[error("failed to fetch key set: {0}")]
    KeyFetch(#[source] anyhow::Error),
}
