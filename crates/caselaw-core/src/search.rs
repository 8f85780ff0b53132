//! Diversity-aware semantic search.
//!
//! [`search_index`] embeds the query in query mode, fetches `fetch_k`
//! nearest candidates with their vectors, re-ranks them with maximal
//! marginal relevance (MMR) to penalise near-duplicates, and finally drops
//! repeated `metadata.id` values.
//!
//! # MMR
//!
//! ```text
//! next = argmax_i  λ · sim(q, d_i) − (1 − λ) · max_{j ∈ selected} sim(d_i, d_j)
//! ```
//!
//! `λ = 1` is plain similarity ranking; `λ = 0` maximises diversity.

use std::collections::HashSet;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::embedding::{cosine_similarity, embed_query, Embedder};
use crate::models::{Metadata, ScoredRecord, ID_KEY, PAGE_CONTENT_KEY};
use crate::store::VectorStore;

/// Search tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Results to return after re-ranking.
    pub top_k: usize,
    /// Candidates fetched from the store before re-ranking.
    pub fetch_k: usize,
    /// Relevance/diversity trade-off in `[0, 1]`.
    pub lambda: f32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 20,
            fetch_k: 20,
            lambda: 0.5,
        }
    }
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    #[serde(rename = "pageContent")]
    pub page_content: String,
    pub metadata: Metadata,
}

/// Indices of `candidates` chosen by MMR, in selection order.
pub fn maximal_marginal_relevance(
    query: &[f32],
    candidates: &[Vec<f32>],
    lambda: f32,
    k: usize,
) -> Vec<usize> {
    let limit = k.min(candidates.len());
    if limit == 0 {
        return Vec::new();
    }

    let relevance: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, c))
        .collect();

    let mut selected: Vec<usize> = Vec::with_capacity(limit);
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();

    while selected.len() < limit {
        let mut best_pos = 0usize;
        let mut best_score = f32::NEG_INFINITY;

        for (pos, &i) in remaining.iter().enumerate() {
            let redundancy = selected
                .iter()
                .map(|&j| cosine_similarity(&candidates[i], &candidates[j]))
                .fold(f32::NEG_INFINITY, f32::max);
            let redundancy = if selected.is_empty() { 0.0 } else { redundancy };
            let score = lambda * relevance[i] - (1.0 - lambda) * redundancy;
            if score > best_score {
                best_score = score;
                best_pos = pos;
            }
        }

        selected.push(remaining.remove(best_pos));
    }

    selected
}

/// Keep the first hit for each `metadata.id`; hits without one are keyed by record id.
pub fn dedupe_by_metadata_id(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|h| {
            let key = h
                .metadata
                .get(ID_KEY)
                .and_then(|v| v.as_str())
                .unwrap_or(h.id.as_str())
                .to_string();
            seen.insert(key)
        })
        .collect()
}

fn to_hit(record: ScoredRecord) -> SearchHit {
    let page_content = record
        .metadata
        .get(PAGE_CONTENT_KEY)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    SearchHit {
        id: record.id,
        score: record.score,
        page_content,
        metadata: record.metadata,
    }
}

/// Run a diversity-aware search against `index`.
pub async fn search_index(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    index: &str,
    query: &str,
    opts: SearchOptions,
) -> Result<Vec<SearchHit>> {
    if query.trim().is_empty() {
        bail!("query must not be empty");
    }

    let query_vec = embed_query(embedder, query).await?;
    let fetch_k = opts.fetch_k.max(opts.top_k);
    let candidates = store.query(index, &query_vec, fetch_k, true).await?;

    let vectors: Vec<Vec<f32>> = candidates
        .iter()
        .map(|c| c.values.clone().unwrap_or_default())
        .collect();
    let order = maximal_marginal_relevance(&query_vec, &vectors, opts.lambda, opts.top_k);

    let mut slots: Vec<Option<ScoredRecord>> = candidates.into_iter().map(Some).collect();
    let hits = order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .map(to_hit)
        .collect();

    Ok(dedupe_by_metadata_id(hits))
}
