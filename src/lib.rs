//! Dream journaling backend — vector-searchable dream storage with
//! AI-generated analysis, imagery, and conversational chat.
//!
//! Dreams are stored as records in a category-scoped, vector-searchable
//! store and enriched on demand through an OpenAI-compatible completion
//! service. Every read and write is scoped to the owner's verified email.
//!
//! # Architecture
//!
//! - **Storage**: SQLite with FTS5 for keyword search and
//!   [sqlite-vec](https://github.com/asg017/sqlite-vec) for vector search,
//!   merged via Reciprocal Rank Fusion
//! - **Embeddings**: OpenAI-compatible `/embeddings` endpoint (1536 dims)
//! - **Enrichment**: bounded-retry analysis and image generation, persisted
//!   back through idempotent partial updates
//! - **Identity**: RS256 identity tokens verified against a published JWKS
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite database initialization, schema, and migrations
//! - [`store`] — Category-scoped record store with hybrid similarity search
//! - [`embedding`] — Text-to-vector pipeline behind [`embedding::EmbeddingProvider`]
//! - [`completion`] — Text/chat/function/image completion adapter
//! - [`dreams`] — Owner-scoped dream repository
//! - [`enrich`] — Analysis and imagery enrichment workflow
//! - [`chat`] — Per-user chat sessions and grounded function-calling
//! - [`auth`] — Identity token verification
//! - [`export`] — JSON / text / PDF rendering of dream collections

pub mod auth;
pub mod chat;
pub mod completion;
pub mod config;
pub mod db;
pub mod dreams;
pub mod embedding;
pub mod enrich;
pub mod error;
pub mod export;
pub mod store;
