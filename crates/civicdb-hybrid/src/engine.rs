use std::sync::Arc;

use tracing::{debug, info, warn};

use civicdb_core::config::RetrievalConfig;
use civicdb_core::traits::{CorpusSource, EmbedProvider, VectorStore};
use civicdb_core::types::{AskResult, Citation, Confidence, CorpusSection, LexicalMatch, RetrievalMode, VectorMatch};
use civicdb_text::KeywordRanker;
use civicdb_vector::{VectorOutcome, VectorRetriever};

use crate::calibrate::{confidence_from_distance, confidence_from_score};

pub const NO_MATCH_ANSWER: &str = "I could not find a strong local-code match in the current database. Try adding details like permit type, project scope, tenant issue, or business type.";

/// Outcome of one `ask`, before it is rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    Semantic(Vec<VectorMatch>),
    Lexical(Vec<LexicalMatch>),
    NoMatch,
}

impl Retrieval {
    /// Semantic matches win; lexical matches are the fallback.
    pub fn resolve(vector: VectorOutcome, lexical: Vec<LexicalMatch>) -> Self {
        match vector {
            VectorOutcome::Matches(matches) if !matches.is_empty() => Self::Semantic(matches),
            _ if !lexical.is_empty() => Self::Lexical(lexical),
            _ => Self::NoMatch,
        }
    }

    pub fn into_result(self, config: &RetrievalConfig) -> AskResult {
        match self {
            Self::Semantic(matches) if !matches.is_empty() => {
                let confidence = matches
                    .first()
                    .map_or(Confidence::Low, |best| confidence_from_distance(best.quality, &config.thresholds));
                render(matches.iter().map(|m| &m.section), confidence, RetrievalMode::Semantic)
            }
            Self::Lexical(matches) if !matches.is_empty() => {
                let total: u32 = matches.iter().map(|m| m.quality).sum();
                let confidence = confidence_from_score(total, &config.thresholds);
                render(matches.iter().map(|m| &m.section), confidence, RetrievalMode::KeywordFallback)
            }
            _ => AskResult {
                answer: NO_MATCH_ANSWER.to_string(),
                confidence: Confidence::Low,
                retrieval_mode: RetrievalMode::KeywordFallback,
                citations: Vec::new(),
            },
        }
    }
}

fn render<'a>(sections: impl Iterator<Item = &'a CorpusSection> + Clone, confidence: Confidence, mode: RetrievalMode) -> AskResult {
    let answer = sections.clone().map(CorpusSection::answer_fragment).collect::<Vec<_>>().join(" ");
    AskResult { answer, confidence, retrieval_mode: mode, citations: sections.map(Citation::from).collect() }
}

/// Answers civic-code questions from a corpus, semantic first, keywords second.
pub struct CivicAskEngine {
    corpus: Arc<dyn CorpusSource>,
    vector: VectorRetriever,
    keywords: KeywordRanker,
    config: RetrievalConfig,
}

impl CivicAskEngine {
    pub fn new(
        corpus: Arc<dyn CorpusSource>,
        store: Arc<dyn VectorStore>,
        provider: Option<Arc<dyn EmbedProvider>>,
        config: RetrievalConfig,
    ) -> Self {
        let vector = VectorRetriever::new(provider, store, &config);
        let keywords = KeywordRanker::new(Box::new(civicdb_text::SubstringScorer), config.limit);
        Self { corpus, vector, keywords, config }
    }

    /// Swap the lexical ranker, e.g. for a token-exact scorer.
    pub fn with_keyword_ranker(mut self, keywords: KeywordRanker) -> Self {
        self.keywords = keywords;
        self
    }

    pub async fn retrieve(&self, question: &str) -> Retrieval {
        let (listing, vector) = futures::join!(self.corpus.list_all_sections(), self.vector.retrieve(question));
        let sections = listing.unwrap_or_else(|e| {
            warn!("listing corpus failed, treating it as empty: {e:#}");
            Vec::new()
        });
        Retrieval::resolve(vector, self.keywords.rank(sections, question))
    }

    /// Never fails: every degraded path ends in a fallback or the no-match answer.
    pub async fn ask(&self, question: &str) -> AskResult {
        let retrieval = self.retrieve(question).await;
        let result = retrieval.into_result(&self.config);
        match result.retrieval_mode {
            RetrievalMode::Semantic => info!(citations = result.citations.len(), confidence = ?result.confidence, "answered from embeddings"),
            RetrievalMode::KeywordFallback if result.citations.is_empty() => debug!("no match for question"),
            RetrievalMode::KeywordFallback => info!(citations = result.citations.len(), confidence = ?result.confidence, "answered from keyword fallback"),
        }
        result
    }
}
