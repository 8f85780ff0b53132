//! Side-table metadata reader.
//!
//! The side-table is a JSON file of curated case fields:
//!
//! ```json
//! { "documents": [ { "filename": "case12.pdf", "title": "Roe v. Wade", ... } ] }
//! ```
//!
//! A missing or unreadable table is not fatal: the pipeline proceeds with
//! loader metadata only.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use caselaw_core::models::SideMetadata;

#[derive(Debug, Deserialize)]
struct SideTableFile {
    #[serde(default)]
    documents: Vec<serde_json::Value>,
}

/// Read the side-table at `path`, or an empty table on any failure.
pub fn read_side_metadata(path: &Path) -> Vec<SideMetadata> {
    match try_read_side_metadata(path) {
        Ok(rows) => {
            tracing::debug!(path = %path.display(), rows = rows.len(), "read side-table");
            rows
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %format!("{:#}", e),
                "could not read side-table metadata; continuing without it"
            );
            Vec::new()
        }
    }
}

fn try_read_side_metadata(path: &Path) -> Result<Vec<SideMetadata>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: SideTableFile = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    // A malformed row is dropped on its own; the rest of the table survives.
    let mut rows = Vec::with_capacity(parsed.documents.len());
    for (position, raw) in parsed.documents.into_iter().enumerate() {
        match serde_json::from_value::<SideMetadata>(raw) {
            Ok(row) => rows.push(row),
            Err(e) => tracing::warn!(
                path = %path.display(),
                row = position,
                error = %e,
                "skipping malformed side-table row"
            ),
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn reads_documents_array() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("db.json");
        fs::write(
            &path,
            r#"{"documents": [
                {"filename": "case12.pdf", "title": "Roe v. Wade", "plaintiff": "Roe",
                 "defendant": "Wade", "date": "1973-01-22", "topic": "Privacy", "outcome": "Reversed"},
                {"filename": "case13.pdf"}
            ]}"#,
        )
        .unwrap();

        let rows = read_side_metadata(&path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title.as_deref(), Some("Roe v. Wade"));
        assert_eq!(rows[1].title, None);
    }

    #[test]
    fn malformed_row_is_skipped_alone() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("db.json");
        fs::write(
            &path,
            r#"{"documents": [
                {"filename": "case12.pdf", "title": "Roe v. Wade"},
                {"filename": "case13.pdf", "date": 1973},
                {"title": "no filename"},
                {"filename": "case14.pdf", "topic": "Contracts"}
            ]}"#,
        )
        .unwrap();

        let rows = read_side_metadata(&path);
        let names: Vec<&str> = rows.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["case12.pdf", "case14.pdf"]);
    }

    #[test]
    fn missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(read_side_metadata(&tmp.path().join("nope.json")).is_empty());
    }

    #[test]
    fn corrupt_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("db.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(read_side_metadata(&path).is_empty());
    }

    #[test]
    fn missing_documents_key_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("db.json");
        fs::write(&path, "{}").unwrap();
        assert!(read_side_metadata(&path).is_empty());
    }
}
