use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use civicdb_core::traits::{CorpusSource, VectorStore};
use civicdb_core::types::CorpusSection;
use civicdb_core::vector::{cosine_distance, parse_vector_literal};

use crate::snapshot::CorpusSnapshot;

/// Read-only view over a corpus snapshot.
///
/// Serves both the full scan used by keyword ranking and brute-force cosine
/// search over the rows that carry an embedding. Cloning shares the rows.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    sections: Arc<Vec<CorpusSection>>,
}

impl SnapshotStore {
    pub fn new(sections: Vec<CorpusSection>) -> Self {
        Self { sections: Arc::new(sections) }
    }

    pub fn from_snapshot(snapshot: &CorpusSnapshot) -> Self {
        Self::new(snapshot.sections())
    }

    pub fn open(path: &Path) -> Result<Self> {
        let snapshot = CorpusSnapshot::load(path)
            .with_context(|| format!("Failed to open corpus snapshot {}", path.display()))?;
        Ok(Self::from_snapshot(&snapshot))
    }

    pub fn len(&self) -> usize { self.sections.len() }

    pub fn is_empty(&self) -> bool { self.sections.is_empty() }
}

#[async_trait]
impl CorpusSource for SnapshotStore {
    async fn list_all_sections(&self) -> Result<Vec<CorpusSection>> {
        Ok(self.sections.as_ref().clone())
    }
}

#[async_trait]
impl VectorStore for SnapshotStore {
    /// Any unparseable stored literal or dimension mismatch fails the whole
    /// query, the way a SQL cast error would.
    async fn nearest_by_embedding(&self, vector: &[f32], limit: usize) -> Result<Vec<(CorpusSection, f64)>> {
        let mut scored: Vec<(&CorpusSection, f64)> = Vec::new();
        for section in self.sections.iter() {
            let Some(literal) = section.embedding.as_deref() else { continue };
            let stored = parse_vector_literal(literal)
                .with_context(|| format!("stored embedding for section '{}'", section.id))?;
            let distance = cosine_distance(&stored, vector)
                .with_context(|| format!("comparing against section '{}'", section.id))?;
            scored.push((section, distance));
        }
        // Stable: equal distances keep snapshot order. NaN sorts last.
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(limit);
        debug!(candidates = scored.len(), "nearest-neighbour scan complete");
        Ok(scored.into_iter().map(|(s, d)| (s.clone(), d)).collect())
    }
}
