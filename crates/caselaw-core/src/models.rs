//! Core data models for the ingestion pipeline.
//!
//! The pipeline is strictly linear:
//!
//! ```text
//! SourceDocument → EnrichedDocument → Chunk → EmbeddingRecord
//! ```
//!
//! Each stage's producer returns a fresh value; nothing is mutated once
//! handed to the next stage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single metadata value.
///
/// The vector store only accepts primitive values (and lists of strings).
/// `Map` exists so loader provenance such as `pdf` or `loc` can be carried
/// until [`flatten_metadata`](crate::metadata::flatten_metadata) removes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<String>),
    Map(BTreeMap<String, MetaValue>),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetaValue::Int(n) => Some(*n),
            MetaValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// True for every variant the vector store accepts as a metadata value.
    pub fn is_flat(&self) -> bool {
        !matches!(self, MetaValue::Map(_))
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Str(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Str(s)
    }
}

impl From<i64> for MetaValue {
    fn from(n: i64) -> Self {
        MetaValue::Int(n)
    }
}

/// Ordered string-keyed metadata record.
pub type Metadata = BTreeMap<String, MetaValue>;

/// Metadata key holding the loader's source path.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the (trimmed) text for display.
pub const PAGE_CONTENT_KEY: &str = "pageContent";
/// Metadata key holding the vector record id.
pub const ID_KEY: &str = "id";

/// Raw text plus provenance, as produced by a document loader.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub text: String,
    /// Loader-provided fields: `source`, `pdf` (`pageCount`), `loc` (`pageNumber`).
    pub provenance: Metadata,
}

impl SourceDocument {
    /// The loader's `source` path, if present.
    pub fn source(&self) -> Option<&str> {
        self.provenance.get(SOURCE_KEY).and_then(MetaValue::as_str)
    }
}

/// One row of the curated side-table, joined to documents by filename.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SideMetadata {
    pub filename: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub plaintiff: Option<String>,
    #[serde(default)]
    pub defendant: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
}

impl SideMetadata {
    /// The descriptive fields as metadata entries, skipping absent ones.
    pub fn to_metadata(&self) -> Metadata {
        let mut out = Metadata::new();
        out.insert("filename".to_string(), self.filename.as_str().into());
        let fields = [
            ("title", &self.title),
            ("plaintiff", &self.plaintiff),
            ("defendant", &self.defendant),
            ("date", &self.date),
            ("topic", &self.topic),
            ("outcome", &self.outcome),
        ];
        for (key, value) in fields {
            if let Some(v) = value {
                out.insert(key.to_string(), v.as_str().into());
            }
        }
        out
    }
}

/// A source document whose provenance has been overlaid with side-table fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedDocument {
    pub text: String,
    pub metadata: Metadata,
}

/// A bounded text window of one enriched document.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    /// The parent document's metadata, unchanged.
    pub metadata: Metadata,
    /// Position of the chunk within its parent document.
    pub chunk_index: usize,
    /// Character offsets of the window in the parent text.
    pub char_start: usize,
    pub char_end: usize,
}

/// A vector ready to be written to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Metadata,
}

/// Creation parameters for a vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: String,
    pub cloud: String,
    pub region: String,
    /// Block until the index reports ready.
    pub wait_until_ready: bool,
    /// Treat "already exists" as success.
    pub suppress_conflicts: bool,
}

/// Statistics reported by the vector store for an index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_record_count: u64,
    #[serde(default)]
    pub dimension: Option<usize>,
}

/// A query match returned by the vector store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    pub id: String,
    pub score: f32,
    /// Present when the query asked for values.
    #[serde(skip_serializing)]
    pub values: Option<Vec<f32>>,
    pub metadata: Metadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_value_untagged_json() {
        let json = r#"{"a": "x", "b": 3, "c": 1.5, "d": true, "e": ["p", "q"], "f": {"g": 2}}"#;
        let meta: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta["a"], MetaValue::Str("x".into()));
        assert_eq!(meta["b"], MetaValue::Int(3));
        assert_eq!(meta["c"], MetaValue::Float(1.5));
        assert_eq!(meta["d"], MetaValue::Bool(true));
        assert_eq!(meta["e"], MetaValue::List(vec!["p".into(), "q".into()]));
        assert!(!meta["f"].is_flat());
    }

    #[test]
    fn side_metadata_skips_absent_fields() {
        let side = SideMetadata {
            filename: "case1.pdf".into(),
            title: Some("Doe v. Roe".into()),
            ..Default::default()
        };
        let meta = side.to_metadata();
        assert_eq!(meta.len(), 2);
        assert_eq!(meta["title"].as_str(), Some("Doe v. Roe"));
        assert!(!meta.contains_key("plaintiff"));
    }
}
