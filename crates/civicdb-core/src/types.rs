//! Domain types used by the lexical and vector retrieval paths.

use serde::{Deserialize, Serialize};

pub type SectionId = String;

/// One citable unit of civic code text.
///
/// - `id`: stable identity across ingestion runs
/// - `source_title`/`source_url`/`section`: citation metadata; the
///   (`source_url`, `section`) pair is unique within a corpus
/// - `tags`: curated labels, weighted double by the lexical scorer
/// - `content`: full text, scored and excerpted verbatim
/// - `embedding`: stored vector literal, absent until backfilled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusSection {
    pub id: SectionId,
    pub source_title: String,
    pub source_url: String,
    pub section: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<String>,
}

impl CorpusSection {
    /// Text handed to the embedding provider when backfilling this section.
    pub fn embedding_input(&self) -> String {
        format!("{}\n{}\n{}", self.section, self.tags.join(" "), self.content)
    }

    /// `"<section>: <content>"`, the unit concatenated into answers.
    pub fn answer_fragment(&self) -> String {
        format!("{}: {}", self.section, self.content)
    }
}

/// A section paired with the quality signal of the path that found it.
///
/// Lives for a single retrieval call.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedMatch<Q> {
    pub section: CorpusSection,
    pub quality: Q,
}

/// Lexical match: integer score, higher is better.
pub type LexicalMatch = RankedMatch<u32>;

/// Vector match: cosine distance, lower is better.
pub type VectorMatch = RankedMatch<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Which retrieval path produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetrievalMode {
    Semantic,
    KeywordFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub source_title: String,
    pub source_url: String,
    pub section: String,
    pub excerpt: String,
}

impl From<&CorpusSection> for Citation {
    fn from(section: &CorpusSection) -> Self {
        Self {
            source_title: section.source_title.clone(),
            source_url: section.source_url.clone(),
            section: section.section.clone(),
            excerpt: section.content.clone(),
        }
    }
}

/// The single value returned by `ask`. Built fresh per question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskResult {
    pub answer: String,
    pub confidence: Confidence,
    pub retrieval_mode: RetrievalMode,
    pub citations: Vec<Citation>,
}
