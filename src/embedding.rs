//! Remote embedding providers.
//!
//! Implements the core [`Embedder`] trait for the Voyage AI embeddings API.
//! Every call carries the caller's [`InputType`]; the provider has no
//! default mode.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! When retries are exhausted the last error is returned unchanged, so a
//! transport timeout stays recognisable to the caller.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use caselaw_core::embedding::{Embedder, InputType};

use crate::config::EmbeddingConfig;

/// Environment variable holding the Voyage API key.
pub const VOYAGE_API_KEY_ENV: &str = "VOYAGE_API_KEY";

const VOYAGE_DEFAULT_URL: &str = "https://api.voyageai.com/v1/embeddings";

/// Embedding provider backed by the Voyage AI API.
pub struct VoyageEmbedder {
    client: reqwest::Client,
    api_key: String,
    url: String,
    model: String,
    dims: usize,
    max_retries: u32,
}

impl VoyageEmbedder {
    /// Create a provider from configuration and `VOYAGE_API_KEY`.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var(VOYAGE_API_KEY_ENV)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", VOYAGE_API_KEY_ENV))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &EmbeddingConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| VOYAGE_DEFAULT_URL.to_string()),
            model: config.model.clone(),
            dims: config.dims,
            max_retries: config.max_retries,
        })
    }
}

#[derive(Debug, Deserialize)]
struct VoyageResponse {
    data: Vec<VoyageEmbedding>,
}

#[derive(Debug, Deserialize)]
struct VoyageEmbedding {
    embedding: Vec<f32>,
    index: usize,
}

/// Extract vectors from a Voyage response, ordered by their `index` field.
///
/// The indices must cover `0..n` exactly once each.
fn parse_voyage_response(json: serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let mut parsed: VoyageResponse = serde_json::from_value(json)
        .map_err(|e| anyhow::anyhow!("Invalid Voyage response: {}", e))?;
    parsed.data.sort_by_key(|d| d.index);
    for (position, item) in parsed.data.iter().enumerate() {
        if item.index != position {
            bail!(
                "Invalid Voyage response: expected embedding index {}, got {}",
                position,
                item.index
            );
        }
    }
    Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl Embedder for VoyageEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String], mode: InputType) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
            "input_type": mode.as_str(),
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_voyage_response(json);
                    }

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        tracing::debug!(attempt, %status, "voyage request failed; retrying");
                        last_err = Some(anyhow::anyhow!(
                            "Voyage API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    // Client error (not 429): fail now
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Voyage API error {}: {}", status, body_text);
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "voyage request error; retrying");
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Embedding failed after retries")))
    }
}

/// Create the configured embedding provider.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "voyage" => Ok(Arc::new(VoyageEmbedder::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}
