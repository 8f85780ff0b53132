//! Document discovery and parsing.
//!
//! A [`DocumentLoader`] produces the [`SourceDocument`]s that feed the
//! bootstrap pipeline. The built-in [`PdfDirectoryLoader`] walks a
//! directory recursively, keeps files matching the include globs, and
//! emits one document per PDF page with provenance metadata:
//!
//! ```text
//! { "source": "<path>", "pdf": { "pageCount": N }, "loc": { "pageNumber": n } }
//! ```
//!
//! Files that do not match the globs are ignored. A PDF that fails to parse
//! is skipped with a warning.

use anyhow::{bail, Result};
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use caselaw_core::models::{MetaValue, Metadata, SourceDocument, SOURCE_KEY};

use crate::config::SourcesConfig;
use crate::extract::extract_pdf_pages;

/// A source of raw documents for ingestion.
///
/// Implement this to feed the pipeline from somewhere other than a local
/// directory of PDFs (tests use an in-memory implementation).
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Human-readable description of where documents come from.
    fn describe(&self) -> String;

    /// Load every supported document, in a deterministic order.
    async fn load(&self) -> Result<Vec<SourceDocument>>;
}

/// Loads PDFs from a directory tree.
pub struct PdfDirectoryLoader {
    root: PathBuf,
    include_globs: Vec<String>,
    follow_symlinks: bool,
}

impl PdfDirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include_globs: vec!["**/*.pdf".to_string()],
            follow_symlinks: false,
        }
    }

    pub fn from_config(config: &SourcesConfig) -> Self {
        Self {
            root: config.root.clone(),
            include_globs: config.include_globs.clone(),
            follow_symlinks: config.follow_symlinks,
        }
    }

    /// Matching file paths under the root, sorted.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let root = &self.root;
        if !root.exists() {
            bail!("Document root does not exist: {}", root.display());
        }

        let include_set = build_globset(&self.include_globs)?;
        let mut paths = Vec::new();

        for entry in WalkDir::new(root).follow_links(self.follow_symlinks) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            if include_set.is_match(relative) {
                paths.push(path.to_path_buf());
            }
        }

        // Sort for deterministic ordering
        paths.sort();
        Ok(paths)
    }
}

#[async_trait]
impl DocumentLoader for PdfDirectoryLoader {
    fn describe(&self) -> String {
        format!("pdf directory {}", self.root.display())
    }

    async fn load(&self) -> Result<Vec<SourceDocument>> {
        let paths = self.discover()?;
        tokio::task::spawn_blocking(move || {
            let mut docs = Vec::new();
            for path in paths {
                match load_pdf(&path) {
                    Ok(pages) => docs.extend(pages),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping unreadable PDF");
                    }
                }
            }
            docs
        })
        .await
        .map_err(Into::into)
    }
}

/// Parse one PDF into per-page documents.
fn load_pdf(path: &Path) -> Result<Vec<SourceDocument>> {
    let bytes = std::fs::read(path)?;
    let pages = extract_pdf_pages(&bytes)?;
    let page_count = pages.len() as i64;
    let source = path.to_string_lossy().to_string();

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| SourceDocument {
            text,
            provenance: page_provenance(&source, page_count, i as i64 + 1),
        })
        .collect())
}

fn page_provenance(source: &str, page_count: i64, page_number: i64) -> Metadata {
    let mut pdf = BTreeMap::new();
    pdf.insert("pageCount".to_string(), MetaValue::Int(page_count));
    let mut loc = BTreeMap::new();
    loc.insert("pageNumber".to_string(), MetaValue::Int(page_number));

    let mut provenance = Metadata::new();
    provenance.insert(SOURCE_KEY.to_string(), source.into());
    provenance.insert("pdf".to_string(), MetaValue::Map(pdf));
    provenance.insert("loc".to_string(), MetaValue::Map(loc));
    provenance
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
