//! In-memory [`VectorStore`] implementation for testing and offline runs.
//!
//! Uses `HashMap`/`BTreeMap` behind `std::sync::RwLock` for thread safety.
//! Query is brute-force cosine similarity over every stored record.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{EmbeddingRecord, IndexSpec, IndexStats, ScoredRecord};

use super::VectorStore;

struct MemoryIndex {
    dimension: usize,
    records: BTreeMap<String, EmbeddingRecord>,
}

/// In-memory vector store.
pub struct InMemoryVectorStore {
    indexes: RwLock<HashMap<String, MemoryIndex>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            indexes: RwLock::new(HashMap::new()),
        }
    }

    /// Whether an index with this name exists.
    pub fn has_index(&self, index: &str) -> bool {
        self.indexes.read().unwrap().contains_key(index)
    }

    /// Fetch a stored record by id.
    pub fn get(&self, index: &str, id: &str) -> Option<EmbeddingRecord> {
        let indexes = self.indexes.read().unwrap();
        indexes.get(index).and_then(|i| i.records.get(id).cloned())
    }

    /// All records of an index, ordered by id.
    pub fn records(&self, index: &str) -> Vec<EmbeddingRecord> {
        let indexes = self.indexes.read().unwrap();
        indexes
            .get(index)
            .map(|i| i.records.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let mut indexes = self.indexes.write().unwrap();
        if indexes.contains_key(&spec.name) {
            if spec.suppress_conflicts {
                return Ok(());
            }
            bail!("Index '{}' already exists", spec.name);
        }
        indexes.insert(
            spec.name.clone(),
            MemoryIndex {
                dimension: spec.dimension,
                records: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn describe_index_stats(&self, index: &str) -> Result<IndexStats> {
        let indexes = self.indexes.read().unwrap();
        let idx = indexes
            .get(index)
            .ok_or_else(|| anyhow::anyhow!("Index '{}' not found", index))?;
        Ok(IndexStats {
            total_record_count: idx.records.len() as u64,
            dimension: Some(idx.dimension),
        })
    }

    async fn upsert(&self, index: &str, records: &[EmbeddingRecord]) -> Result<usize> {
        let mut indexes = self.indexes.write().unwrap();
        let idx = indexes
            .get_mut(index)
            .ok_or_else(|| anyhow::anyhow!("Index '{}' not found", index))?;

        // Reject the whole call before writing anything.
        if let Some(bad) = records.iter().find(|r| r.values.len() != idx.dimension) {
            bail!(
                "Vector dimension {} does not match index dimension {} (id {})",
                bad.values.len(),
                idx.dimension,
                bad.id
            );
        }

        for r in records {
            idx.records.insert(r.id.clone(), r.clone());
        }
        Ok(records.len())
    }

    async fn query(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
        include_values: bool,
    ) -> Result<Vec<ScoredRecord>> {
        let indexes = self.indexes.read().unwrap();
        let idx = indexes
            .get(index)
            .ok_or_else(|| anyhow::anyhow!("Index '{}' not found", index))?;

        let mut matches: Vec<ScoredRecord> = idx
            .records
            .values()
            .map(|r| ScoredRecord {
                id: r.id.clone(),
                score: cosine_similarity(vector, &r.values),
                values: include_values.then(|| r.values.clone()),
                metadata: r.metadata.clone(),
            })
            .collect();
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;

    fn spec(name: &str, suppress: bool) -> IndexSpec {
        IndexSpec {
            name: name.to_string(),
            dimension: 2,
            metric: "cosine".into(),
            cloud: "aws".into(),
            region: "us-east-1".into(),
            wait_until_ready: true,
            suppress_conflicts: suppress,
        }
    }

    fn record(id: &str, values: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            id: id.to_string(),
            values,
            metadata: Metadata::new(),
        }
    }

    #[tokio::test]
    async fn create_index_conflicts() {
        let store = InMemoryVectorStore::new();
        store.create_index(&spec("cases", true)).await.unwrap();
        store.create_index(&spec("cases", true)).await.unwrap();
        assert!(store.create_index(&spec("cases", false)).await.is_err());
    }

    #[tokio::test]
    async fn upsert_overwrites_by_id() {
        let store = InMemoryVectorStore::new();
        store.create_index(&spec("cases", true)).await.unwrap();
        store
            .upsert("cases", &[record("a", vec![1.0, 0.0]), record("b", vec![0.0, 1.0])])
            .await
            .unwrap();
        store
            .upsert("cases", &[record("a", vec![0.5, 0.5])])
            .await
            .unwrap();

        let stats = store.describe_index_stats("cases").await.unwrap();
        assert_eq!(stats.total_record_count, 2);
        assert_eq!(store.get("cases", "a").unwrap().values, vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn upsert_rejects_wrong_dimension() {
        let store = InMemoryVectorStore::new();
        store.create_index(&spec("cases", true)).await.unwrap();
        let err = store
            .upsert("cases", &[record("a", vec![1.0, 0.0]), record("b", vec![1.0])])
            .await;
        assert!(err.is_err());
        assert!(store.records("cases").is_empty());
    }

    #[tokio::test]
    async fn missing_index_errors() {
        let store = InMemoryVectorStore::new();
        assert!(store.describe_index_stats("nope").await.is_err());
        assert!(store.upsert("nope", &[]).await.is_err());
    }

    #[tokio::test]
    async fn query_orders_by_similarity() {
        let store = InMemoryVectorStore::new();
        store.create_index(&spec("cases", true)).await.unwrap();
        store
            .upsert(
                "cases",
                &[
                    record("far", vec![-1.0, 0.0]),
                    record("near", vec![1.0, 0.1]),
                    record("mid", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let hits = store.query("cases", &[1.0, 0.0], 2, true).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "near");
        assert_eq!(hits[1].id, "mid");
        assert!(hits[0].values.is_some());

        let hits = store.query("cases", &[1.0, 0.0], 5, false).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits[0].values.is_none());
    }
}
