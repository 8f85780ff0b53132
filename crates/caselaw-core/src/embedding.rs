//! Embedder trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that remote embedding backends implement,
//! the mandatory [`InputType`] switch between ingestion and search, and the
//! alignment check callers run on every batch.
//!
//! Concrete providers (Voyage) live in the `caselaw` app crate.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which side of an asymmetric embedding space a text belongs to.
///
/// Documents are embedded during ingestion and queries during search.
/// Mixing the two degrades relevance without any error, so there is no
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Document,
    Query,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Document => "document",
            InputType::Query => "query",
        }
    }
}

/// A remote embedding provider.
///
/// Implementations issue one provider call per `embed` invocation and
/// return one vector per input text, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"voyage-law-2"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `1024`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts in the given mode.
    async fn embed(&self, texts: &[String], mode: InputType) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single search query.
pub async fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let inputs = [text.to_string()];
    let vectors = embedder.embed(&inputs, InputType::Query).await?;
    check_alignment(inputs.len(), &vectors)?;
    vectors
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
}

/// Verify an embedding response is positionally usable for `expected` inputs.
///
/// Fails on a count mismatch or on an empty vector. A failing batch must be
/// discarded as a whole.
pub fn check_alignment(expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != expected {
        bail!(
            "Invalid embeddings response: expected {} vectors, received {}",
            expected,
            vectors.len()
        );
    }
    if let Some(pos) = vectors.iter().position(|v| v.is_empty()) {
        bail!("Invalid embeddings response: vector {} is empty", pos);
    }
    Ok(())
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
