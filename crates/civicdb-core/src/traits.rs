use async_trait::async_trait;

use crate::types::CorpusSection;

/// Turns text into an embedding vector.
///
/// Implementations may call a remote API or compute vectors locally. Errors
/// are ordinary failures here; the retriever decides that they mean
/// "semantic search unavailable".
#[async_trait]
pub trait EmbedProvider: Send + Sync {
    /// Stable identifier for the provider/model, recorded on backfilled rows.
    fn embedder_id(&self) -> &str;
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

/// Full scan over the corpus, used by the lexical path.
#[async_trait]
pub trait CorpusSource: Send + Sync {
    async fn list_all_sections(&self) -> anyhow::Result<Vec<CorpusSection>>;
}

/// Nearest-neighbour lookup over sections that carry an embedding.
///
/// Results are ordered by ascending cosine distance and hold at most `limit`
/// entries.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn nearest_by_embedding(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> anyhow::Result<Vec<(CorpusSection, f64)>>;
}
