//! Pinecone vector store over the REST API.
//!
//! Two planes are involved:
//!
//! - the control plane (`https://api.pinecone.io`) creates and describes
//!   indexes and reports each index's data-plane host;
//! - the data plane (`https://{host}`) serves stats, upserts and queries.
//!
//! Hosts are resolved once per index and cached. The API key comes from
//! `PINECONE_API_KEY`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use caselaw_core::models::{EmbeddingRecord, IndexSpec, IndexStats, Metadata, ScoredRecord};
use caselaw_core::store::VectorStore;

use crate::config::IndexConfig;

/// Environment variable holding the Pinecone API key.
pub const PINECONE_API_KEY_ENV: &str = "PINECONE_API_KEY";

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct PineconeStore {
    client: reqwest::Client,
    api_key: String,
    control_url: String,
    ready_timeout: Duration,
    hosts: Mutex<HashMap<String, String>>,
}

impl PineconeStore {
    /// Create a client from configuration and `PINECONE_API_KEY`.
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let api_key = std::env::var(PINECONE_API_KEY_ENV)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", PINECONE_API_KEY_ENV))?;
        Self::with_api_key(api_key, Duration::from_secs(config.ready_timeout_secs))
    }

    pub fn with_api_key(api_key: String, ready_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_key,
            control_url: CONTROL_PLANE_URL.to_string(),
            ready_timeout,
            hosts: Mutex::new(HashMap::new()),
        })
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn describe_index(&self, index: &str) -> Result<IndexDescription> {
        let url = format!("{}/indexes/{}", self.control_url, index);
        let resp = self.request(reqwest::Method::GET, &url).send().await?;
        let resp = check_status(resp, "describe index").await?;
        let desc: IndexDescription = resp.json().await?;
        Ok(desc)
    }

    async fn wait_until_ready(&self, index: &str) -> Result<IndexDescription> {
        let started = Instant::now();
        loop {
            let desc = self.describe_index(index).await?;
            if desc.status.ready {
                return Ok(desc);
            }
            if started.elapsed() >= self.ready_timeout {
                bail!(
                    "Index '{}' not ready after {}s (state: {})",
                    index,
                    self.ready_timeout.as_secs(),
                    desc.status.state.as_deref().unwrap_or("unknown")
                );
            }
            tracing::debug!(index, state = ?desc.status.state, "waiting for index to become ready");
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    fn cached_host(&self, index: &str) -> Option<String> {
        self.hosts.lock().ok().and_then(|h| h.get(index).cloned())
    }

    fn remember_host(&self, index: &str, host: &str) {
        if let Ok(mut hosts) = self.hosts.lock() {
            hosts.insert(index.to_string(), data_plane_url(host));
        }
    }

    /// Data-plane base URL for `index`, resolving it on first use.
    async fn host(&self, index: &str) -> Result<String> {
        if let Some(host) = self.cached_host(index) {
            return Ok(host);
        }
        let desc = self
            .describe_index(index)
            .await
            .with_context(|| format!("Failed to resolve host for index '{}'", index))?;
        self.remember_host(index, &desc.host);
        Ok(data_plane_url(&desc.host))
    }
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    total_vector_count: u64,
    #[serde(default)]
    dimension: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    values: Vec<f32>,
    #[serde(default)]
    metadata: Metadata,
}

fn data_plane_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", host.trim_end_matches('/'))
    }
}

fn create_index_body(spec: &IndexSpec) -> serde_json::Value {
    serde_json::json!({
        "name": spec.name,
        "dimension": spec.dimension,
        "metric": spec.metric,
        "spec": {
            "serverless": {
                "cloud": spec.cloud,
                "region": spec.region,
            }
        }
    })
}

fn upsert_body(records: &[EmbeddingRecord]) -> serde_json::Value {
    serde_json::json!({ "vectors": records })
}

fn into_scored(matches: Vec<QueryMatch>, include_values: bool) -> Vec<ScoredRecord> {
    matches
        .into_iter()
        .map(|m| ScoredRecord {
            id: m.id,
            score: m.score,
            values: if include_values { Some(m.values) } else { None },
            metadata: m.metadata,
        })
        .collect()
}

async fn check_status(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    bail!("Pinecone {} failed ({}): {}", what, status, body);
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let url = format!("{}/indexes", self.control_url);
        let resp = self
            .request(reqwest::Method::POST, &url)
            .json(&create_index_body(spec))
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::CONFLICT {
            if !spec.suppress_conflicts {
                bail!("Index '{}' already exists", spec.name);
            }
            tracing::debug!(index = %spec.name, "index already exists");
        } else {
            check_status(resp, "create index").await?;
            tracing::info!(index = %spec.name, dimension = spec.dimension, "created index");
        }

        let desc = if spec.wait_until_ready {
            self.wait_until_ready(&spec.name).await?
        } else {
            self.describe_index(&spec.name).await?
        };
        self.remember_host(&spec.name, &desc.host);
        Ok(())
    }

    async fn describe_index_stats(&self, index: &str) -> Result<IndexStats> {
        let url = format!("{}/describe_index_stats", self.host(index).await?);
        let resp = self
            .request(reqwest::Method::POST, &url)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let resp = check_status(resp, "describe index stats").await?;
        let stats: StatsResponse = resp.json().await?;
        Ok(IndexStats {
            total_record_count: stats.total_vector_count,
            dimension: stats.dimension,
        })
    }

    async fn upsert(&self, index: &str, records: &[EmbeddingRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let url = format!("{}/vectors/upsert", self.host(index).await?);
        let resp = self
            .request(reqwest::Method::POST, &url)
            .json(&upsert_body(records))
            .send()
            .await?;
        let resp = check_status(resp, "upsert").await?;
        let body: UpsertResponse = resp.json().await?;
        Ok(body.upserted_count)
    }

    async fn query(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
        include_values: bool,
    ) -> Result<Vec<ScoredRecord>> {
        let url = format!("{}/query", self.host(index).await?);
        let resp = self
            .request(reqwest::Method::POST, &url)
            .json(&serde_json::json!({
                "vector": vector,
                "topK": top_k,
                "includeMetadata": true,
                "includeValues": include_values,
            }))
            .send()
            .await?;
        let resp = check_status(resp, "query").await?;
        let body: QueryResponse = resp.json().await?;
        Ok(into_scored(body.matches, include_values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caselaw_core::models::MetaValue;

    #[test]
    fn host_gets_https_scheme() {
        assert_eq!(
            data_plane_url("cases-abc.svc.pinecone.io"),
            "https://cases-abc.svc.pinecone.io"
        );
        assert_eq!(data_plane_url("http://localhost:5080/"), "http://localhost:5080");
    }

    #[test]
    fn create_body_is_serverless() {
        let spec = IndexSpec {
            name: "cases".into(),
            dimension: 1024,
            metric: "cosine".into(),
            cloud: "aws".into(),
            region: "us-east-1".into(),
            wait_until_ready: true,
            suppress_conflicts: true,
        };
        let body = create_index_body(&spec);
        assert_eq!(body["dimension"], 1024);
        assert_eq!(body["spec"]["serverless"]["region"], "us-east-1");
    }

    #[test]
    fn stats_reads_total_vector_count() {
        let stats: StatsResponse = serde_json::from_str(
            r#"{"namespaces": {"": {"vectorCount": 5}}, "dimension": 1024,
                "indexFullness": 0.0, "totalVectorCount": 5}"#,
        )
        .unwrap();
        assert_eq!(stats.total_vector_count, 5);
        assert_eq!(stats.dimension, Some(1024));
    }

    #[test]
    fn upsert_body_shape() {
        let mut metadata = Metadata::new();
        metadata.insert("title".into(), "Roe v. Wade".into());
        let body = upsert_body(&[EmbeddingRecord {
            id: "a".into(),
            values: vec![0.5, 0.25],
            metadata,
        }]);
        assert_eq!(body["vectors"][0]["id"], "a");
        assert_eq!(body["vectors"][0]["metadata"]["title"], "Roe v. Wade");
    }

    #[test]
    fn query_matches_parse_metadata() {
        let body: QueryResponse = serde_json::from_str(
            r#"{"matches": [{"id": "a", "score": 0.9, "values": [1.0, 0.0],
                "metadata": {"pageContent": "text", "totalPages": 3}}], "namespace": ""}"#,
        )
        .unwrap();
        let hits = into_scored(body.matches, false);
        assert_eq!(hits[0].id, "a");
        assert!(hits[0].values.is_none());
        assert_eq!(hits[0].metadata["totalPages"].as_i64(), Some(3));
        assert_eq!(
            hits[0].metadata["pageContent"],
            MetaValue::Str("text".into())
        );
    }
}
