//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the boundary contract the pipeline depends
//! on. Handles are constructed by the caller and passed in, so tests can
//! substitute fakes and the in-memory backend.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{EmbeddingRecord, IndexSpec, IndexStats, ScoredRecord};

/// Abstract vector index backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_index`](VectorStore::create_index) | Create a named index |
/// | [`describe_index_stats`](VectorStore::describe_index_stats) | Record count and dimension |
/// | [`upsert`](VectorStore::upsert) | Insert-or-overwrite records by id |
/// | [`query`](VectorStore::query) | Nearest-neighbour search |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name for logging (e.g. `"pinecone"`).
    fn name(&self) -> &str;

    /// Create the index described by `spec`.
    ///
    /// When the index already exists this succeeds if
    /// `spec.suppress_conflicts` is set and fails otherwise.
    async fn create_index(&self, spec: &IndexSpec) -> Result<()>;

    /// Report statistics for an existing index.
    async fn describe_index_stats(&self, index: &str) -> Result<IndexStats>;

    /// Write records in a single call. An existing id is overwritten.
    ///
    /// Returns the number of records written.
    async fn upsert(&self, index: &str, records: &[EmbeddingRecord]) -> Result<usize>;

    /// Return up to `top_k` records nearest to `vector`, best first.
    async fn query(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
        include_values: bool,
    ) -> Result<Vec<ScoredRecord>>;
}
