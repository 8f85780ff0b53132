//! Bootstrap orchestration.
//!
//! Composes the pipeline end to end:
//!
//! ```text
//! ensure index → skip if populated → load → validate → merge → split
//!   → for each outer batch: validate → ids → embed → align → upsert
//! ```
//!
//! The run moves through [`BootstrapState`]s; `Failed` is reachable from
//! any of them. Outer batches run strictly one after another. A failure
//! inside one batch is logged and the loop moves on, so a completed run may
//! leave some chunks out of the index. Loader failures, missing
//! configuration and timeouts fail the whole run.
//!
//! A run is bounded by `ingest.max_duration_secs`; when the ceiling is hit
//! the run is abandoned and reported as [`BootstrapError::Timeout`].
//! Re-running is safe: a populated index short-circuits, and upserts
//! overwrite by id.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tracing::Instrument;
use uuid::Uuid;

use caselaw_core::chunk::split_documents;
use caselaw_core::embedding::{Embedder, InputType};
use caselaw_core::gate::{ensure_index, index_has_vectors};
use caselaw_core::metadata::{merge_metadata, SideTable};
use caselaw_core::models::{Chunk, EnrichedDocument};
use caselaw_core::records::{into_records, prepare_batch};
use caselaw_core::store::memory::InMemoryVectorStore;
use caselaw_core::store::VectorStore;
use caselaw_core::upsert::upsert_batched;
use caselaw_core::validate::is_valid_content_within;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::loader::{DocumentLoader, PdfDirectoryLoader};
use crate::side_table::read_side_metadata;
use crate::vector_store::create_store;

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    NotStarted,
    IndexEnsured,
    /// The index already held vectors; nothing was ingested.
    Skipped,
    Loading,
    Merging,
    Splitting,
    /// Processing outer batch `batch` (1-based) of `of`.
    BatchLoop { batch: usize, of: usize },
    Done,
    Failed,
}

impl BootstrapState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(&self, next: &BootstrapState) -> bool {
        use BootstrapState::*;
        matches!(
            (self, next),
            (_, Failed)
                | (NotStarted, IndexEnsured)
                | (NotStarted, Loading)
                | (IndexEnsured, Skipped)
                | (IndexEnsured, Loading)
                | (Loading, Merging)
                | (Merging, Splitting)
                | (Splitting, BatchLoop { .. })
                | (Splitting, Done)
                | (BatchLoop { .. }, BatchLoop { .. })
                | (BatchLoop { .. }, Done)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BootstrapState::Skipped | BootstrapState::Done | BootstrapState::Failed
        )
    }
}

/// Run-level failures. Batch-level failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("no index name configured; set [index].name or PINECONE_INDEX")]
    MissingIndexName,
    #[error("No documents found in {root}")]
    NoDocuments { root: String },
    #[error("a bootstrap run is already in progress")]
    AlreadyRunning,
    #[error("Operation timed out: {0}")]
    Timeout(String),
    #[error("Bootstrap procedure failed: {0:#}")]
    Failed(anyhow::Error),
}

impl BootstrapError {
    /// Sort an arbitrary pipeline error into the run-level taxonomy.
    pub fn classify(err: anyhow::Error) -> Self {
        let err = match err.downcast::<BootstrapError>() {
            Ok(typed) => return typed,
            Err(err) => err,
        };
        if is_timeout(&err) {
            BootstrapError::Timeout(format!("{:#}", err))
        } else {
            BootstrapError::Failed(err)
        }
    }
}

/// True when any cause in the chain is a transport or wall-clock timeout.
pub fn is_timeout(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .is_some_and(|e| e.is_timeout())
            || cause.is::<tokio::time::error::Elapsed>()
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BootstrapOptions {
    /// Ingest even when the index already holds vectors.
    pub force: bool,
    /// Load and split only; no index, embedding or upsert calls.
    pub dry_run: bool,
}

/// Counts from a completed ingestion run.
#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub run_id: Uuid,
    pub index: String,
    pub documents_loaded: usize,
    pub documents_valid: usize,
    pub chunks: usize,
    pub batches: usize,
    pub batches_skipped: usize,
    pub batches_failed: usize,
    pub records_upserted: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// What a dry run would ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapPlan {
    pub index: String,
    pub documents_loaded: usize,
    pub documents_valid: usize,
    pub chunks: usize,
    pub valid_chunks: usize,
    pub batches: usize,
}

#[derive(Debug, Clone)]
pub enum BootstrapOutcome {
    Skipped { index: String },
    Planned(BootstrapPlan),
    Completed(IngestSummary),
}

enum BatchResult {
    NoValidContent,
    Written(usize),
}

/// Runs the bootstrap pipeline against injected store, embedder and loader.
pub struct Bootstrapper {
    config: Arc<Config>,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    loader: Arc<dyn DocumentLoader>,
    state: Mutex<BootstrapState>,
    running: tokio::sync::Mutex<()>,
}

impl Bootstrapper {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        loader: Arc<dyn DocumentLoader>,
    ) -> Self {
        Self {
            config,
            store,
            embedder,
            loader,
            state: Mutex::new(BootstrapState::NotStarted),
            running: tokio::sync::Mutex::new(()),
        }
    }

    /// Build the configured providers and a PDF directory loader.
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        let store = create_store(&config.index)?;
        let embedder = create_embedder(&config.embedding)?;
        let loader = Arc::new(PdfDirectoryLoader::from_config(&config.sources));
        Ok(Self::new(config, store, embedder, loader))
    }

    pub fn store(&self) -> Arc<dyn VectorStore> {
        self.store.clone()
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// State of the current or most recent run.
    pub fn state(&self) -> BootstrapState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(BootstrapState::Failed)
    }

    fn set_state(&self, next: BootstrapState) {
        if let Ok(mut state) = self.state.lock() {
            let from = *state;
            if !from.can_advance_to(&next) {
                tracing::warn!(?from, to = ?next, "unexpected bootstrap state transition");
            }
            tracing::debug!(?from, to = ?next, "bootstrap state");
            *state = next;
        }
    }

    fn reset_state(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = BootstrapState::NotStarted;
        }
    }

    /// Run the pipeline against `index`, or the configured index when `None`.
    ///
    /// Only one run per `Bootstrapper` may be in flight; a second concurrent
    /// call fails with [`BootstrapError::AlreadyRunning`].
    pub async fn run(
        &self,
        index: Option<&str>,
        opts: BootstrapOptions,
    ) -> Result<BootstrapOutcome, BootstrapError> {
        let index = index
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| self.config.index_name())
            .ok_or(BootstrapError::MissingIndexName)?;

        let _guard = self
            .running
            .try_lock()
            .map_err(|_| BootstrapError::AlreadyRunning)?;
        self.reset_state();

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("bootstrap", %run_id, index = %index);
        let ceiling = self.config.max_duration();

        let result =
            tokio::time::timeout(ceiling, self.run_inner(&index, run_id, opts).instrument(span))
                .await;

        match result {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) => {
                self.set_state(BootstrapState::Failed);
                let err = BootstrapError::classify(e);
                tracing::error!(%run_id, index = %index, error = %err, "bootstrap failed");
                Err(err)
            }
            Err(_) => {
                self.set_state(BootstrapState::Failed);
                tracing::error!(
                    %run_id,
                    index = %index,
                    limit_secs = ceiling.as_secs(),
                    "bootstrap exceeded its time limit; abandoning run"
                );
                Err(BootstrapError::Timeout(format!(
                    "run exceeded {}s",
                    ceiling.as_secs()
                )))
            }
        }
    }

    async fn run_inner(
        &self,
        index: &str,
        run_id: Uuid,
        opts: BootstrapOptions,
    ) -> Result<BootstrapOutcome> {
        let started_at = Utc::now();
        tracing::info!(store = self.store.name(), dry_run = opts.dry_run, "running bootstrap");

        if !opts.dry_run {
            ensure_index(self.store.as_ref(), &self.config.index_spec(index)).await?;
            self.set_state(BootstrapState::IndexEnsured);
            tracing::info!("index ensured");

            if !opts.force && index_has_vectors(self.store.as_ref(), index).await {
                self.set_state(BootstrapState::Skipped);
                tracing::info!("index already has vectors; skipping ingestion");
                return Ok(BootstrapOutcome::Skipped {
                    index: index.to_string(),
                });
            }
        }

        self.set_state(BootstrapState::Loading);
        let documents = self.loader.load().await?;
        if documents.is_empty() {
            tracing::warn!(source = %self.loader.describe(), "no documents found");
            return Err(BootstrapError::NoDocuments {
                root: self.loader.describe(),
            }
            .into());
        }
        let documents_loaded = documents.len();
        tracing::info!(documents = documents_loaded, "loaded documents");

        self.set_state(BootstrapState::Merging);
        let table = SideTable::new(read_side_metadata(&self.config.sources.metadata_path));
        let max_chars = self.config.chunking.max_content_chars;
        let enriched: Vec<EnrichedDocument> = documents
            .iter()
            .filter(|d| is_valid_content_within(&d.text, max_chars))
            .map(|d| merge_metadata(d, &table))
            .collect();
        let documents_valid = enriched.len();
        tracing::info!(
            valid = documents_valid,
            side_table_rows = table.len(),
            "merged metadata"
        );

        self.set_state(BootstrapState::Splitting);
        let chunks = split_documents(&enriched, self.config.chunking_params());
        let batch_size = self.config.ingest.batch_size;
        let batches = chunks.len().div_ceil(batch_size);
        tracing::info!(chunks = chunks.len(), batches, "split documents");

        if opts.dry_run {
            let valid_chunks = chunks
                .iter()
                .filter(|c| is_valid_content_within(&c.text, max_chars))
                .count();
            self.set_state(BootstrapState::Done);
            return Ok(BootstrapOutcome::Planned(BootstrapPlan {
                index: index.to_string(),
                documents_loaded,
                documents_valid,
                chunks: chunks.len(),
                valid_chunks,
                batches,
            }));
        }

        let mut summary = IngestSummary {
            run_id,
            index: index.to_string(),
            documents_loaded,
            documents_valid,
            chunks: chunks.len(),
            batches,
            batches_skipped: 0,
            batches_failed: 0,
            records_upserted: 0,
            started_at,
            finished_at: started_at,
        };

        let delay = self.config.batch_delay();
        for (i, batch) in chunks.chunks(batch_size).enumerate() {
            let n = i + 1;
            self.set_state(BootstrapState::BatchLoop { batch: n, of: batches });
            tracing::info!(batch = n, of = batches, "processing batch");

            let called_provider = match self.process_batch(index, batch).await {
                Ok(BatchResult::NoValidContent) => {
                    tracing::info!(batch = n, "skipping batch; no valid content");
                    summary.batches_skipped += 1;
                    false
                }
                Ok(BatchResult::Written(count)) => {
                    summary.records_upserted += count;
                    true
                }
                Err(e) => {
                    if is_timeout(&e) {
                        tracing::warn!(batch = n, "batch timed out");
                    }
                    tracing::error!(
                        batch = n,
                        batch_size = batch.len(),
                        error = %format!("{:#}", e),
                        "batch failed; continuing"
                    );
                    summary.batches_failed += 1;
                    true
                }
            };

            if called_provider && n < batches && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        self.set_state(BootstrapState::Done);
        summary.finished_at = Utc::now();
        tracing::info!(
            records = summary.records_upserted,
            failed_batches = summary.batches_failed,
            "bootstrap completed"
        );
        Ok(BootstrapOutcome::Completed(summary))
    }

    /// Validate, embed and upsert one outer batch.
    async fn process_batch(&self, index: &str, batch: &[Chunk]) -> Result<BatchResult> {
        let prepared = prepare_batch(batch, self.config.chunking.max_content_chars);
        if prepared.is_empty() {
            return Ok(BatchResult::NoValidContent);
        }

        let texts: Vec<String> = prepared.iter().map(|p| p.text.clone()).collect();
        tracing::debug!(chunks = texts.len(), "generating embeddings");
        let vectors = self.embedder.embed(&texts, InputType::Document).await?;
        let records = into_records(prepared, vectors)?;

        let written = upsert_batched(
            self.store.as_ref(),
            index,
            &records,
            self.config.ingest.upsert_batch_size,
        )
        .await?;
        Ok(BatchResult::Written(written))
    }
}

/// Stand-in provider for dry runs, which never embed.
struct NoEmbedder {
    dims: usize,
}

#[async_trait::async_trait]
impl Embedder for NoEmbedder {
    fn model_name(&self) -> &str {
        "none"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, _texts: &[String], _mode: InputType) -> Result<Vec<Vec<f32>>> {
        anyhow::bail!("embedding is disabled for dry runs")
    }
}

/// CLI entry point for `caselaw bootstrap`.
///
/// A dry run needs no provider credentials.
pub async fn run_bootstrap(
    config: Config,
    index: Option<String>,
    opts: BootstrapOptions,
) -> Result<()> {
    let config = Arc::new(config);
    let bootstrapper = if opts.dry_run {
        Bootstrapper::new(
            config.clone(),
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(NoEmbedder {
                dims: config.embedding.dims,
            }),
            Arc::new(PdfDirectoryLoader::from_config(&config.sources)),
        )
    } else {
        Bootstrapper::from_config(config)?
    };
    let outcome = bootstrapper.run(index.as_deref(), opts).await?;
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &BootstrapOutcome) {
    match outcome {
        BootstrapOutcome::Skipped { index } => {
            println!("bootstrap {}", index);
            println!("  index already populated; skipped");
            println!("ok");
        }
        BootstrapOutcome::Planned(plan) => {
            println!("bootstrap {} (dry-run)", plan.index);
            println!("  documents loaded: {}", plan.documents_loaded);
            println!("  documents valid: {}", plan.documents_valid);
            println!("  chunks: {}", plan.chunks);
            println!("  valid chunks: {}", plan.valid_chunks);
            println!("  batches: {}", plan.batches);
        }
        BootstrapOutcome::Completed(summary) => {
            let elapsed = summary.finished_at - summary.started_at;
            println!("bootstrap {}", summary.index);
            println!("  run: {}", summary.run_id);
            println!("  documents loaded: {}", summary.documents_loaded);
            println!("  documents valid: {}", summary.documents_valid);
            println!("  chunks: {}", summary.chunks);
            println!(
                "  batches: {} ({} skipped, {} failed)",
                summary.batches, summary.batches_skipped, summary.batches_failed
            );
            println!("  records upserted: {}", summary.records_upserted);
            println!("  elapsed: {}s", elapsed.num_seconds());
            println!("ok");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_legal() {
        use BootstrapState::*;
        let path = [
            NotStarted,
            IndexEnsured,
            Loading,
            Merging,
            Splitting,
            BatchLoop { batch: 1, of: 2 },
            BatchLoop { batch: 2, of: 2 },
            Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance_to(&pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
        assert!(IndexEnsured.can_advance_to(&Skipped));
        assert!(Done.is_terminal());
    }

    #[test]
    fn failed_reachable_from_anywhere() {
        use BootstrapState::*;
        for s in [NotStarted, IndexEnsured, Loading, Merging, Splitting, Done] {
            assert!(s.can_advance_to(&Failed));
        }
    }

    #[test]
    fn illegal_transitions() {
        use BootstrapState::*;
        assert!(!Loading.can_advance_to(&Splitting));
        assert!(!Skipped.can_advance_to(&Loading));
        assert!(!Done.can_advance_to(&BatchLoop { batch: 1, of: 1 }));
    }

    #[test]
    fn classify_keeps_typed_errors() {
        let err: anyhow::Error = BootstrapError::NoDocuments {
            root: "docs".into(),
        }
        .into();
        assert!(matches!(
            BootstrapError::classify(err),
            BootstrapError::NoDocuments { .. }
        ));
    }

    #[test]
    fn classify_generic_failure() {
        let err = anyhow::anyhow!("loader exploded").context("Failed to load");
        match BootstrapError::classify(err) {
            BootstrapError::Failed(e) => assert!(format!("{:#}", e).contains("loader exploded")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn classify_elapsed_as_timeout() {
        let elapsed = tokio::time::timeout(
            std::time::Duration::from_millis(1),
            tokio::time::sleep(std::time::Duration::from_secs(5)),
        )
        .await
        .unwrap_err();
        let err = anyhow::Error::new(elapsed).context("Upsert of sub-batch 1 failed");
        assert!(matches!(
            BootstrapError::classify(err),
            BootstrapError::Timeout(_)
        ));
    }
}
