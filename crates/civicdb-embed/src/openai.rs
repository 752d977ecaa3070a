//! OpenAI-compatible embedding client.
//!
//! One request per text, no retries: the caller treats any failure as
//! "semantic search unavailable" and falls back immediately.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use civicdb_core::config::EmbeddingSettings;
use civicdb_core::error::Error;
use civicdb_core::traits::EmbedProvider;

pub struct OpenAiProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    id: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

impl OpenAiProvider {
    pub fn new(endpoint: &str, model: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            id: format!("openai:{}", model),
        })
    }

    /// `None` when no non-empty API key is configured.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Option<Self>> {
        let Some(api_key) = settings.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) else {
            return Ok(None);
        };
        let provider = Self::new(
            &settings.endpoint,
            &settings.model,
            api_key,
            Duration::from_millis(settings.timeout_ms),
        )?;
        Ok(Some(provider))
    }
}

/// Pull `data[0].embedding` out of a response body.
///
/// Non-numeric and non-finite entries are dropped; `None` if nothing numeric
/// remains or the shape is wrong.
pub fn parse_embedding_payload(payload: &serde_json::Value) -> Option<Vec<f32>> {
    let values = payload.get("data")?.get(0)?.get("embedding")?.as_array()?;
    let embedding: Vec<f32> = values
        .iter()
        .filter_map(serde_json::Value::as_f64)
        .map(|v| v as f32)
        .filter(|v| v.is_finite())
        .collect();
    (!embedding.is_empty()).then_some(embedding)
}

#[async_trait]
impl EmbedProvider for OpenAiProvider {
    fn embedder_id(&self) -> &str { &self.id }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbedRequest { model: &self.model, input: text })
            .send()
            .await
            .context("Embedding request failed")?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Provider(format!("Embedding request failed with status {status}")).into());
        }

        let payload: serde_json::Value = resp.json().await.context("Failed to parse embedding JSON")?;
        let embedding = parse_embedding_payload(&payload)
            .ok_or_else(|| anyhow!("Embedding response did not include a numeric vector"))?;
        debug!(model = %self.model, dim = embedding.len(), "embedding received");
        Ok(embedding)
    }
}
