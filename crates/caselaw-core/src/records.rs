//! Conversion of chunks into vector records.
//!
//! A batch goes through two steps around the embedding call:
//! [`prepare_batch`] filters invalid chunks and assigns fresh ids, and
//! [`into_records`] pairs the prepared chunks with their vectors after the
//! alignment check.

use anyhow::Result;
use uuid::Uuid;

use crate::embedding::check_alignment;
use crate::metadata::flatten_metadata;
use crate::models::{Chunk, EmbeddingRecord, Metadata, ID_KEY, PAGE_CONTENT_KEY};
use crate::validate::is_valid_content_within;

/// A chunk that passed validation and has its record id assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedChunk {
    pub id: String,
    /// Trimmed chunk text, the exact string sent for embedding.
    pub text: String,
    /// Flattened metadata including `id` and `pageContent`.
    pub metadata: Metadata,
}

/// Drop invalid chunks and give every survivor a new UUID.
///
/// Ids are generated here, per run, and never derived from content.
pub fn prepare_batch(chunks: &[Chunk], max_content_chars: usize) -> Vec<PreparedChunk> {
    chunks
        .iter()
        .filter(|c| is_valid_content_within(&c.text, max_content_chars))
        .map(|c| {
            let id = Uuid::new_v4().to_string();
            let text = c.text.trim().to_string();
            let mut metadata = flatten_metadata(&c.metadata);
            metadata.insert(ID_KEY.to_string(), id.as_str().into());
            metadata.insert(PAGE_CONTENT_KEY.to_string(), text.as_str().into());
            PreparedChunk { id, text, metadata }
        })
        .collect()
}

/// Pair prepared chunks with their vectors, positionally.
///
/// Fails without producing any record when the vector count does not match.
pub fn into_records(
    prepared: Vec<PreparedChunk>,
    vectors: Vec<Vec<f32>>,
) -> Result<Vec<EmbeddingRecord>> {
    check_alignment(prepared.len(), &vectors)?;
    Ok(prepared
        .into_iter()
        .zip(vectors)
        .map(|(p, values)| EmbeddingRecord {
            id: p.id,
            values,
            metadata: p.metadata,
        })
        .collect())
}
