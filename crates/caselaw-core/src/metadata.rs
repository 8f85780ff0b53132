//! Side-table join and metadata flattening.
//!
//! [`merge_metadata`] overlays curated side-table fields onto loader
//! provenance, keyed by the basename of the document's `source` path.
//! [`flatten_metadata`] reduces a metadata record to the primitive-only
//! shape the vector store accepts.
//!
//! # Example
//!
//! ```rust
//! use caselaw_core::metadata::{merge_metadata, SideTable};
//! use caselaw_core::models::{Metadata, SideMetadata, SourceDocument};
//!
//! let table = SideTable::new(vec![SideMetadata {
//!     filename: "case12.pdf".into(),
//!     title: Some("Roe v. Wade".into()),
//!     ..Default::default()
//! }]);
//!
//! let mut provenance = Metadata::new();
//! provenance.insert("source".into(), "/srv/docs/case12.pdf".into());
//! let doc = SourceDocument { text: "Opinion text".into(), provenance };
//!
//! let enriched = merge_metadata(&doc, &table);
//! assert_eq!(enriched.metadata["title"].as_str(), Some("Roe v. Wade"));
//! ```

use std::collections::HashMap;
use std::path::Path;

use crate::models::{EnrichedDocument, MetaValue, Metadata, SideMetadata, SourceDocument};
use crate::models::PAGE_CONTENT_KEY;

/// Side-table rows indexed by filename.
///
/// When the table lists a filename more than once, the first row wins.
#[derive(Debug, Clone, Default)]
pub struct SideTable {
    rows: HashMap<String, SideMetadata>,
}

impl SideTable {
    pub fn new(rows: Vec<SideMetadata>) -> Self {
        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            map.entry(row.filename.clone()).or_insert(row);
        }
        Self { rows: map }
    }

    pub fn get(&self, filename: &str) -> Option<&SideMetadata> {
        self.rows.get(filename)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Final path component of a loader `source` value.
pub fn source_basename(source: &str) -> &str {
    Path::new(source)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(source)
}

/// Join a document with its side-table row, if any.
///
/// On a match the side-table fields take precedence over loader fields and
/// the document text is copied under `pageContent`. Without a match the
/// document keeps only its loader metadata. Documents are never dropped.
pub fn merge_metadata(doc: &SourceDocument, table: &SideTable) -> EnrichedDocument {
    let mut metadata = doc.provenance.clone();

    let row = doc
        .source()
        .map(source_basename)
        .and_then(|name| table.get(name));

    if let Some(row) = row {
        metadata.extend(row.to_metadata());
        metadata.insert(PAGE_CONTENT_KEY.to_string(), doc.text.as_str().into());
    }

    EnrichedDocument {
        text: doc.text.clone(),
        metadata,
    }
}

/// Reduce metadata to primitive values only.
///
/// `pdf.pageCount` is hoisted to `totalPages`; `pdf`, `loc`, and any other
/// nested map are dropped. Applying this twice gives the same result as once.
pub fn flatten_metadata(raw: &Metadata) -> Metadata {
    let mut flat = raw.clone();

    if let Some(MetaValue::Map(pdf)) = flat.remove("pdf") {
        if let Some(count) = pdf.get("pageCount") {
            let total = match count.as_i64() {
                Some(n) => MetaValue::Int(n),
                None => count.clone(),
            };
            if total.is_flat() {
                flat.insert("totalPages".to_string(), total);
            }
        }
    }

    flat.retain(|_, v| v.is_flat());
    flat
}
