//! Merge civic-documents datasets into the corpus snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use civicdb_core::types::CorpusSection;

use crate::snapshot::{CorpusSnapshot, SnapshotRow};

/// One entry of a dataset file (a JSON array of these).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRecord {
    pub id: String,
    pub source_title: String,
    pub source_url: String,
    pub section: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub content: String,
}

impl From<DatasetRecord> for CorpusSection {
    fn from(r: DatasetRecord) -> Self {
        Self {
            id: r.id,
            source_title: r.source_title,
            source_url: r.source_url,
            section: r.section,
            tags: r.tags,
            content: r.content,
            embedding: None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Updated rows whose embedding was dropped because its input text changed.
    pub invalidated: usize,
}

/// Read a dataset file, or every `.json` file under a directory in path order.
pub fn load_dataset(path: &Path) -> Result<Vec<DatasetRecord>> {
    let files: Vec<PathBuf> = if path.is_dir() {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut records = Vec::new();
    for file in &files {
        let raw = fs::read_to_string(file).with_context(|| format!("Failed to read dataset {}", file.display()))?;
        let parsed: Vec<DatasetRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("Dataset {} must be a JSON array of sections", file.display()))?;
        info!(file = %file.display(), records = parsed.len(), "dataset loaded");
        records.extend(parsed);
    }
    Ok(records)
}

/// Upsert records by id, in order.
///
/// Existing rows keep their embedding unless the embedding input (section,
/// tags or content) changed. The merge is all-or-nothing: if the result would
/// break id or (`source_url`, `section`) uniqueness the snapshot is untouched.
pub fn merge_dataset(snapshot: &mut CorpusSnapshot, records: Vec<DatasetRecord>) -> civicdb_core::Result<IngestReport> {
    let mut merged = snapshot.clone();
    let mut report = IngestReport::default();

    for record in records {
        let incoming = CorpusSection::from(record);
        match merged.sections.iter_mut().find(|row| row.section.id == incoming.id) {
            Some(row) => {
                let input_changed = row.section.embedding_input() != incoming.embedding_input();
                let metadata_changed = row.section.source_title != incoming.source_title
                    || row.section.source_url != incoming.source_url;
                if !input_changed && !metadata_changed {
                    report.unchanged += 1;
                    continue;
                }
                let embedding = row.section.embedding.take();
                row.section = CorpusSection { embedding, ..incoming };
                if input_changed && row.section.embedding.is_some() {
                    row.clear_embedding();
                    report.invalidated += 1;
                }
                report.updated += 1;
            }
            None => {
                merged.sections.push(SnapshotRow::new(incoming));
                report.inserted += 1;
            }
        }
    }

    merged.validate()?;
    *snapshot = merged;
    Ok(report)
}
