//! TOML configuration with environment overrides.
//!
//! Settings are read from a TOML file (default `./config/caselaw.toml`).
//! Provider API keys never live in the file; they come from
//! `PINECONE_API_KEY` and `VOYAGE_API_KEY`. The target index name may be
//! overridden with `PINECONE_INDEX`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use caselaw_core::chunk::ChunkingParams;
use caselaw_core::models::IndexSpec;
use caselaw_core::search::SearchOptions;

/// Environment variable overriding `[index].name`.
pub const INDEX_NAME_ENV: &str = "PINECONE_INDEX";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_store_provider")]
    pub provider: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default = "default_cloud")]
    pub cloud: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            provider: default_store_provider(),
            name: None,
            dimension: default_dimension(),
            metric: default_metric(),
            cloud: default_cloud(),
            region: default_region(),
            ready_timeout_secs: default_ready_timeout_secs(),
        }
    }
}

fn default_store_provider() -> String {
    "pinecone".to_string()
}
fn default_dimension() -> usize {
    1024
}
fn default_metric() -> String {
    "cosine".to_string()
}
fn default_cloud() -> String {
    "aws".to_string()
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_ready_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            include_globs: default_include_globs(),
            metadata_path: default_metadata_path(),
            follow_symlinks: false,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("docs")
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.pdf".to_string()]
}
fn default_metadata_path() -> PathBuf {
    PathBuf::from("docs/db.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_max_content_chars() -> usize {
    caselaw_core::validate::MAX_CONTENT_CHARS
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            upsert_batch_size: default_upsert_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            max_duration_secs: default_max_duration_secs(),
        }
    }
}

fn default_batch_size() -> usize {
    5
}
fn default_upsert_batch_size() -> usize {
    2
}
fn default_batch_delay_ms() -> u64 {
    1000
}
fn default_max_duration_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_dimension")]
    pub dims: usize,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_model(),
            dims: default_dimension(),
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "voyage".to_string()
}
fn default_model() -> String {
    "voyage-law-2".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_connect_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_top_k")]
    pub fetch_k: usize,
    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            fetch_k: default_top_k(),
            mmr_lambda: default_mmr_lambda(),
        }
    }
}

fn default_top_k() -> usize {
    20
}
fn default_mmr_lambda() -> f32 {
    0.5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn resolve_index_name(from_env: Option<String>, configured: Option<&str>) -> Option<String> {
    let non_blank = |n: &str| {
        let n = n.trim();
        (!n.is_empty()).then(|| n.to_string())
    };
    from_env
        .as_deref()
        .and_then(non_blank)
        .or_else(|| configured.and_then(non_blank))
}

impl Config {
    /// All-defaults configuration, used by tests and when no file is present.
    pub fn minimal() -> Self {
        Self {
            index: IndexConfig::default(),
            sources: SourcesConfig::default(),
            chunking: ChunkingConfig::default(),
            ingest: IngestConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// The configured index name, with `PINECONE_INDEX` taking precedence.
    ///
    /// Blank values count as unset.
    pub fn index_name(&self) -> Option<String> {
        resolve_index_name(std::env::var(INDEX_NAME_ENV).ok(), self.index.name.as_deref())
    }

    /// Creation parameters for `name` under this configuration.
    pub fn index_spec(&self, name: &str) -> IndexSpec {
        IndexSpec {
            name: name.to_string(),
            dimension: self.index.dimension,
            metric: self.index.metric.clone(),
            cloud: self.index.cloud.clone(),
            region: self.index.region.clone(),
            wait_until_ready: true,
            suppress_conflicts: true,
        }
    }

    pub fn chunking_params(&self) -> ChunkingParams {
        ChunkingParams {
            chunk_size: self.chunking.chunk_size,
            chunk_overlap: self.chunking.chunk_overlap,
        }
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            top_k: self.retrieval.top_k,
            fetch_k: self.retrieval.fetch_k,
            lambda: self.retrieval.mmr_lambda,
        }
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.ingest.batch_delay_ms)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.ingest.max_duration_secs)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<()> {
    // Validate chunking
    ChunkingParams::new(config.chunking.chunk_size, config.chunking.chunk_overlap)
        .context("Invalid [chunking] settings")?;
    if config.chunking.max_content_chars == 0 {
        anyhow::bail!("chunking.max_content_chars must be > 0");
    }

    // Validate ingest batching
    if config.ingest.batch_size == 0 {
        anyhow::bail!("ingest.batch_size must be > 0");
    }
    if config.ingest.upsert_batch_size == 0 {
        anyhow::bail!("ingest.upsert_batch_size must be > 0");
    }
    if config.ingest.max_duration_secs == 0 {
        anyhow::bail!("ingest.max_duration_secs must be > 0");
    }

    // Validate index / embedding agreement
    if config.index.dimension == 0 {
        anyhow::bail!("index.dimension must be > 0");
    }
    if config.embedding.dims != config.index.dimension {
        anyhow::bail!(
            "embedding.dims ({}) must equal index.dimension ({})",
            config.embedding.dims,
            config.index.dimension
        );
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.fetch_k < config.retrieval.top_k {
        anyhow::bail!("retrieval.fetch_k must be >= retrieval.top_k");
    }
    if !(0.0..=1.0).contains(&config.retrieval.mmr_lambda) {
        anyhow::bail!("retrieval.mmr_lambda must be in [0.0, 1.0]");
    }

    match config.index.provider.as_str() {
        "pinecone" | "memory" => {}
        other => anyhow::bail!(
            "Unknown index provider: '{}'. Must be pinecone or memory.",
            other
        ),
    }

    match config.embedding.provider.as_str() {
        "voyage" => {}
        other => anyhow::bail!("Unknown embedding provider: '{}'. Must be voyage.", other),
    }

    Ok(())
}
