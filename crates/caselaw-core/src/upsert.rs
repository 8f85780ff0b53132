//! Sub-batched upsert.

use anyhow::{bail, Context, Result};

use crate::models::EmbeddingRecord;
use crate::store::VectorStore;

/// Write `records` in sequential sub-batches of `sub_batch_size`.
///
/// Stops at the first failing sub-batch and returns its error; earlier
/// sub-batches stay written. Because upsert overwrites by id, retrying the
/// same records is safe.
pub async fn upsert_batched(
    store: &dyn VectorStore,
    index: &str,
    records: &[EmbeddingRecord],
    sub_batch_size: usize,
) -> Result<usize> {
    if sub_batch_size == 0 {
        bail!("upsert sub-batch size must be > 0");
    }

    let mut written = 0usize;
    for (i, batch) in records.chunks(sub_batch_size).enumerate() {
        tracing::debug!(
            index,
            offset = i * sub_batch_size,
            count = batch.len(),
            "upserting sub-batch"
        );
        written += store
            .upsert(index, batch)
            .await
            .with_context(|| format!("Upsert of sub-batch {} failed", i + 1))?;
    }
    Ok(written)
}
