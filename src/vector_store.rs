//! Vector store selection.

use anyhow::{bail, Result};
use std::sync::Arc;

use caselaw_core::store::memory::InMemoryVectorStore;
use caselaw_core::store::VectorStore;

use crate::config::IndexConfig;
use crate::pinecone::PineconeStore;

/// Build the store named by `[index].provider`.
///
/// `memory` is process-local and starts empty, which makes it useful for
/// dry runs and tests but not for serving a persistent corpus.
pub fn create_store(config: &IndexConfig) -> Result<Arc<dyn VectorStore>> {
    match config.provider.as_str() {
        "pinecone" => Ok(Arc::new(PineconeStore::new(config)?)),
        "memory" => Ok(Arc::new(InMemoryVectorStore::new())),
        other => bail!("Unknown index provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_provider_builds() {
        let config = IndexConfig {
            provider: "memory".into(),
            ..IndexConfig::default()
        };
        assert_eq!(create_store(&config).unwrap().name(), "memory");
    }

    #[test]
    fn unknown_provider_errors() {
        let config = IndexConfig {
            provider: "qdrant".into(),
            ..IndexConfig::default()
        };
        assert!(create_store(&config).is_err());
    }
}
