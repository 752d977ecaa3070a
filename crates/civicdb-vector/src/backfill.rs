//! Embedding backfill for the corpus snapshot.
//!
//! Selection: rows without an embedding, plus rows whose recorded content hash
//! no longer matches their embedding input. `force` re-embeds everything.
//! Rows are updated in place one at a time, so on a provider failure the rows
//! already embedded stay embedded and the caller can still save the snapshot.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use civicdb_core::traits::EmbedProvider;
use civicdb_core::vector::to_vector_literal;

use crate::snapshot::{CorpusSnapshot, SnapshotRow};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackfillReport {
    pub embedded: usize,
    pub skipped: usize,
}

pub fn hash_content(s: &str) -> String {
    blake3::hash(s.as_bytes()).to_hex().to_string()
}

fn needs_embedding(row: &SnapshotRow) -> bool {
    if row.section.embedding.is_none() {
        return true;
    }
    match &row.content_hash {
        Some(h) => *h != hash_content(&row.section.embedding_input()),
        None => false,
    }
}

pub async fn backfill_embeddings(
    snapshot: &mut CorpusSnapshot,
    provider: &dyn EmbedProvider,
    force: bool,
) -> Result<BackfillReport> {
    let pending: Vec<usize> = snapshot
        .sections
        .iter()
        .enumerate()
        .filter(|(_, row)| force || needs_embedding(row))
        .map(|(i, _)| i)
        .collect();
    let mut report = BackfillReport { embedded: 0, skipped: snapshot.sections.len() - pending.len() };
    if pending.is_empty() {
        info!("all sections already embedded");
        return Ok(report);
    }

    let pb = ProgressBar::new(pending.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} sections ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );

    for i in pending {
        let row = &mut snapshot.sections[i];
        let input = row.section.embedding_input();
        pb.set_message(row.section.id.clone());
        let embedding = provider
            .embed(&input)
            .await
            .with_context(|| format!("Embedding section '{}' failed", row.section.id))?;
        if embedding.is_empty() {
            bail!("Embedding for section '{}' came back empty", row.section.id);
        }
        row.section.embedding = Some(to_vector_literal(&embedding));
        row.embedding_model = Some(provider.embedder_id().to_string());
        row.embedding_updated_at = Some(Utc::now());
        row.content_hash = Some(hash_content(&input));
        report.embedded += 1;
        pb.inc(1);
    }
    pb.finish_with_message("done");
    info!(embedded = report.embedded, skipped = report.skipped, force, "embedding backfill complete");
    Ok(report)
}

/// Best-effort embedding used right after an ingest.
///
/// Failures are logged, not returned: the merged rows are already valid without
/// embeddings and a later `embed` run picks up whatever is left. Returns how
/// many rows gained an embedding.
pub async fn embed_new_sections(snapshot: &mut CorpusSnapshot, provider: &dyn EmbedProvider) -> usize {
    let before = snapshot.embedded_count();
    if let Err(e) = backfill_embeddings(snapshot, provider, false).await {
        warn!(embedder = provider.embedder_id(), "embedding during ingest stopped early: {e:#}");
    }
    snapshot.embedded_count().saturating_sub(before)
}
