//! Semantic retrieval: embed the question, then ask the store for neighbours.
//!
//! Every failure on this path is reported as [`VectorOutcome::Unavailable`],
//! never as an error. The orchestrator treats all reasons the same way; the
//! reason exists for logs and tests.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use civicdb_core::config::{RetrievalConfig, MAX_RESULTS};
use civicdb_core::traits::{EmbedProvider, VectorStore};
use civicdb_core::types::{RankedMatch, VectorMatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    NoProvider,
    ProviderFailed,
    EmptyEmbedding,
    StoreFailed,
    NoRows,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VectorOutcome {
    /// At least one match, ordered by ascending distance.
    Matches(Vec<VectorMatch>),
    Unavailable(Unavailable),
}

pub struct VectorRetriever {
    provider: Option<Arc<dyn EmbedProvider>>,
    store: Arc<dyn VectorStore>,
    limit: usize,
    step_timeout: Duration,
}

impl VectorRetriever {
    pub fn new(provider: Option<Arc<dyn EmbedProvider>>, store: Arc<dyn VectorStore>, config: &RetrievalConfig) -> Self {
        Self {
            provider,
            store,
            limit: config.limit.clamp(1, MAX_RESULTS),
            step_timeout: Duration::from_millis(config.request_timeout_ms),
        }
    }

    pub async fn retrieve(&self, question: &str) -> VectorOutcome {
        let Some(provider) = &self.provider else {
            debug!("no embedding provider configured");
            return VectorOutcome::Unavailable(Unavailable::NoProvider);
        };

        let embedding = match timeout(self.step_timeout, provider.embed(question)).await {
            Ok(Ok(embedding)) => embedding,
            Ok(Err(e)) => {
                warn!(embedder = provider.embedder_id(), "embedding failed, using keyword fallback: {e:#}");
                return VectorOutcome::Unavailable(Unavailable::ProviderFailed);
            }
            Err(_) => {
                warn!(embedder = provider.embedder_id(), timeout_ms = self.step_timeout.as_millis() as u64, "embedding timed out, using keyword fallback");
                return VectorOutcome::Unavailable(Unavailable::TimedOut);
            }
        };
        if embedding.is_empty() || embedding.iter().any(|v| !v.is_finite()) {
            warn!(embedder = provider.embedder_id(), "provider returned an unusable vector");
            return VectorOutcome::Unavailable(Unavailable::EmptyEmbedding);
        }

        let rows = match timeout(self.step_timeout, self.store.nearest_by_embedding(&embedding, self.limit)).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => {
                warn!("vector query failed, using keyword fallback: {e:#}");
                return VectorOutcome::Unavailable(Unavailable::StoreFailed);
            }
            Err(_) => {
                warn!(timeout_ms = self.step_timeout.as_millis() as u64, "vector query timed out, using keyword fallback");
                return VectorOutcome::Unavailable(Unavailable::TimedOut);
            }
        };
        if rows.is_empty() {
            debug!("no embedded sections to compare against");
            return VectorOutcome::Unavailable(Unavailable::NoRows);
        }

        let matches: Vec<VectorMatch> = rows
            .into_iter()
            .take(self.limit)
            .map(|(section, quality)| RankedMatch { section, quality })
            .collect();
        debug!(matches = matches.len(), best = matches[0].quality, "semantic retrieval succeeded");
        VectorOutcome::Matches(matches)
    }
}
