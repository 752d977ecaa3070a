//! civicdb-embed
//!
//! Embedding providers: an OpenAI-compatible HTTP client for production and a
//! deterministic hashed embedder for offline development and tests.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use civicdb_core::config::{EmbeddingSettings, ProviderKind};
use civicdb_core::traits::EmbedProvider;

pub mod fake;
pub mod openai;

pub use fake::FakeEmbedder;
pub use openai::{parse_embedding_payload, OpenAiProvider};

/// Build the provider selected by configuration.
///
/// `Ok(None)` means semantic search is off: either disabled outright or the
/// OpenAI provider has no API key. That is a normal state, not an error.
pub fn provider_from_settings(settings: &EmbeddingSettings) -> Result<Option<Arc<dyn EmbedProvider>>> {
    let provider: Option<Arc<dyn EmbedProvider>> = match settings.provider {
        ProviderKind::OpenAi => match OpenAiProvider::from_settings(settings)? {
            Some(p) => Some(Arc::new(p)),
            None => {
                info!("no embedding API key configured; semantic search disabled");
                None
            }
        },
        ProviderKind::Fake => Some(Arc::new(FakeEmbedder::new(settings.fake_dim))),
        ProviderKind::Disabled => None,
    };
    if let Some(p) = &provider {
        info!(embedder = p.embedder_id(), "embedding provider ready");
    }
    Ok(provider)
}
