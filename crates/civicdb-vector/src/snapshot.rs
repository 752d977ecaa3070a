use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use civicdb_core::error::{Error, Result};
use civicdb_core::types::CorpusSection;

pub const SNAPSHOT_VERSION: u32 = 1;

/// A stored section plus the bookkeeping written by the embedding backfill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRow {
    #[serde(flatten)]
    pub section: CorpusSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_updated_at: Option<DateTime<Utc>>,
    /// blake3 of the embedding input the stored vector was computed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl SnapshotRow {
    pub fn new(section: CorpusSection) -> Self {
        Self { section, embedding_model: None, embedding_updated_at: None, content_hash: None }
    }

    pub fn clear_embedding(&mut self) {
        self.section.embedding = None;
        self.embedding_model = None;
        self.embedding_updated_at = None;
        self.content_hash = None;
    }
}

/// The whole corpus as one JSON document.
///
/// Row order is preserved across load/save and is the corpus order seen by
/// keyword ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusSnapshot {
    pub version: u32,
    #[serde(default)]
    pub sections: Vec<SnapshotRow>,
}

impl Default for CorpusSnapshot {
    fn default() -> Self { Self { version: SNAPSHOT_VERSION, sections: Vec::new() } }
}

impl CorpusSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("corpus snapshot {}", path.display())))
            }
            Err(e) => return Err(e.into()),
        };
        let snapshot: Self = serde_json::from_str(&raw)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Like [`CorpusSnapshot::load`], but a missing file is an empty corpus.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(Error::NotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    /// Write via a temp file in the target directory, then rename over it.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        fs::create_dir_all(dir)?;
        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Ids are unique and no two rows share (`source_url`, `section`).
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        let mut keys = HashSet::new();
        for row in &self.sections {
            let s = &row.section;
            if !ids.insert(s.id.as_str()) {
                return Err(Error::DuplicateId(s.id.clone()));
            }
            if !keys.insert((s.source_url.as_str(), s.section.as_str())) {
                return Err(Error::DuplicateSection { source_url: s.source_url.clone(), section: s.section.clone() });
            }
        }
        Ok(())
    }

    pub fn sections(&self) -> Vec<CorpusSection> {
        self.sections.iter().map(|row| row.section.clone()).collect()
    }

    pub fn embedded_count(&self) -> usize {
        self.sections.iter().filter(|row| row.section.embedding.is_some()).count()
    }
}
