use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use civicdb_core::config::RetrievalConfig;
use civicdb_core::traits::{CorpusSource, EmbedProvider, VectorStore};
use civicdb_core::types::{Confidence, CorpusSection, RetrievalMode};
use civicdb_hybrid::{CivicAskEngine, Retrieval, NO_MATCH_ANSWER};
use civicdb_text::{KeywordRanker, LexicalScorer};
use civicdb_vector::SnapshotStore;

fn adu(embedding: Option<&str>) -> CorpusSection {
    CorpusSection {
        id: "adu".to_string(),
        source_title: "Municipal Code Title 17".to_string(),
        source_url: "https://example.gov/code/17".to_string(),
        section: "ADU Permits".to_string(),
        tags: vec!["adu".to_string(), "garage".to_string(), "permit".to_string()],
        content: "A permit is required to convert a garage into an accessory dwelling unit.".to_string(),
        embedding: embedding.map(str::to_string),
    }
}

fn numbered(i: usize, content: &str) -> CorpusSection {
    CorpusSection {
        id: format!("s{i}"),
        source_title: "Municipal Code".to_string(),
        source_url: format!("https://example.gov/code/{i}"),
        section: format!("Section {i}"),
        tags: vec![],
        content: content.to_string(),
        embedding: Some("[1,0]".to_string()),
    }
}

struct FixedProvider(Vec<f32>);

#[async_trait]
impl EmbedProvider for FixedProvider {
    fn embedder_id(&self) -> &str { "fixed" }
    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> { Ok(self.0.clone()) }
}

struct DownProvider;

#[async_trait]
impl EmbedProvider for DownProvider {
    fn embedder_id(&self) -> &str { "down" }
    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> { anyhow::bail!("connection refused") }
}

struct HangingProvider;

#[async_trait]
impl EmbedProvider for HangingProvider {
    fn embedder_id(&self) -> &str { "hanging" }
    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(vec![1.0, 0.0])
    }
}

struct BrokenCorpus;

#[async_trait]
impl CorpusSource for BrokenCorpus {
    async fn list_all_sections(&self) -> anyhow::Result<Vec<CorpusSection>> { anyhow::bail!("database offline") }
}

#[async_trait]
impl VectorStore for BrokenCorpus {
    async fn nearest_by_embedding(&self, _v: &[f32], _limit: usize) -> anyhow::Result<Vec<(CorpusSection, f64)>> {
        anyhow::bail!("database offline")
    }
}

fn engine(sections: Vec<CorpusSection>, provider: Option<Arc<dyn EmbedProvider>>) -> CivicAskEngine {
    let store = Arc::new(SnapshotStore::new(sections));
    CivicAskEngine::new(store.clone(), store, provider, RetrievalConfig::default())
}

const GARAGE_QUESTION: &str = "Do I need a permit for my garage conversion?";

#[tokio::test]
async fn keyword_fallback_without_provider() {
    let result = engine(vec![adu(None)], None).ask(GARAGE_QUESTION).await;
    assert_eq!(result.retrieval_mode, RetrievalMode::KeywordFallback);
    assert_eq!(result.confidence, Confidence::Medium);
    assert_eq!(result.citations.len(), 1);
    assert_eq!(result.citations[0].section, "ADU Permits");
    assert_eq!(
        result.answer,
        "ADU Permits: A permit is required to convert a garage into an accessory dwelling unit."
    );
}

#[tokio::test]
async fn function_words_can_lift_keyword_confidence() {
    let fences = CorpusSection {
        id: "fence".to_string(),
        source_title: "Municipal Code Title 17".to_string(),
        source_url: "https://example.gov/code/17".to_string(),
        section: "Fences".to_string(),
        tags: vec!["fence".to_string(), "yard".to_string()],
        content: "Fences that face the street can be four feet; this rule does not apply to side yards.".to_string(),
        embedding: None,
    };
    let result = engine(vec![fences], None).ask("Does this fence rule apply to your yard, can that be?").await;
    assert_eq!(result.retrieval_mode, RetrievalMode::KeywordFallback);
    assert_eq!(result.confidence, Confidence::High);
}

#[tokio::test]
async fn semantic_match_at_close_distance_is_high_confidence() {
    let provider: Arc<dyn EmbedProvider> = Arc::new(FixedProvider(vec![1.0, 0.0]));
    let result = engine(vec![adu(Some("[0.85000000,0.52678269]"))], Some(provider)).ask(GARAGE_QUESTION).await;
    assert_eq!(result.retrieval_mode, RetrievalMode::Semantic);
    assert_eq!(result.confidence, Confidence::High);
    assert_eq!(result.citations.len(), 1);
    assert_eq!(result.citations[0].excerpt, adu(None).content);
}

#[tokio::test]
async fn semantic_wins_even_when_keywords_would_not_match() {
    let provider: Arc<dyn EmbedProvider> = Arc::new(FixedProvider(vec![1.0, 0.0]));
    let result = engine(vec![adu(Some("[0,1]"))], Some(provider)).ask("zoning variance appeal").await;
    assert_eq!(result.retrieval_mode, RetrievalMode::Semantic);
    assert_eq!(result.confidence, Confidence::Low);
    assert_eq!(result.citations.len(), 1);
}

#[tokio::test]
async fn no_match_returns_canned_answer() {
    let result = engine(vec![adu(None)], None).ask("xylophone quartz").await;
    assert_eq!(result.answer, NO_MATCH_ANSWER);
    assert_eq!(result.confidence, Confidence::Low);
    assert_eq!(result.retrieval_mode, RetrievalMode::KeywordFallback);
    assert!(result.citations.is_empty());

    let empty = engine(vec![], None).ask(GARAGE_QUESTION).await;
    assert_eq!(empty.answer, NO_MATCH_ANSWER);
}

#[tokio::test]
async fn provider_failure_falls_back_to_keywords() {
    let result = engine(vec![adu(Some("[1,0]"))], Some(Arc::new(DownProvider))).ask(GARAGE_QUESTION).await;
    assert_eq!(result.retrieval_mode, RetrievalMode::KeywordFallback);
    assert_eq!(result.citations.len(), 1);
}

#[tokio::test]
async fn malformed_stored_vector_falls_back_to_keywords() {
    let provider: Arc<dyn EmbedProvider> = Arc::new(FixedProvider(vec![1.0, 0.0]));
    let result = engine(vec![adu(Some("[not,a,vector]"))], Some(provider)).ask(GARAGE_QUESTION).await;
    assert_eq!(result.retrieval_mode, RetrievalMode::KeywordFallback);
    assert_eq!(result.confidence, Confidence::Medium);
}

#[tokio::test]
async fn slow_provider_times_out_into_fallback() {
    let store = Arc::new(SnapshotStore::new(vec![adu(Some("[1,0]"))]));
    let config = RetrievalConfig { request_timeout_ms: 50, ..RetrievalConfig::default() };
    let engine = CivicAskEngine::new(store.clone(), store, Some(Arc::new(HangingProvider)), config);
    let result = engine.ask(GARAGE_QUESTION).await;
    assert_eq!(result.retrieval_mode, RetrievalMode::KeywordFallback);
    assert_eq!(result.citations.len(), 1);
}

#[tokio::test]
async fn unreachable_corpus_yields_no_match() {
    let broken = Arc::new(BrokenCorpus);
    let engine = CivicAskEngine::new(broken.clone(), broken, Some(Arc::new(DownProvider)), RetrievalConfig::default());
    let result = engine.ask(GARAGE_QUESTION).await;
    assert_eq!(result.answer, NO_MATCH_ANSWER);
    assert!(result.citations.is_empty());
}

#[tokio::test]
async fn citations_never_exceed_three() {
    let sections: Vec<CorpusSection> = (0..7).map(|i| numbered(i, "A permit is needed.")).collect();

    let lexical = engine(sections.clone(), None).ask("permit").await;
    assert_eq!(lexical.citations.len(), 3);
    // summed score 3 x 1 stays below the medium band
    assert_eq!(lexical.confidence, Confidence::Low);

    let provider: Arc<dyn EmbedProvider> = Arc::new(FixedProvider(vec![1.0, 0.0]));
    let semantic = engine(sections, Some(provider)).ask("permit").await;
    assert_eq!(semantic.citations.len(), 3);
    let ids: Vec<&str> = semantic.citations.iter().map(|c| c.section.as_str()).collect();
    assert_eq!(ids, vec!["Section 0", "Section 1", "Section 2"]);
}

#[tokio::test]
async fn answer_joins_fragments_in_rank_order() {
    let sections = vec![
        numbered(0, "Fences need a permit."),
        numbered(1, "Fence permit height permit."),
    ];
    let result = engine(sections, None).ask("fence height permit").await;
    assert_eq!(result.answer, "Section 1: Fence permit height permit. Section 0: Fences need a permit.");
    assert_eq!(result.citations[0].section, "Section 1");
}

#[tokio::test]
async fn identical_inputs_give_byte_identical_output() {
    let provider: Arc<dyn EmbedProvider> = Arc::new(FixedProvider(vec![1.0, 0.0]));
    let semantic = engine(vec![adu(Some("[0.85000000,0.52678269]")), numbered(1, "garage permit")], Some(provider));
    let first = serde_json::to_string(&semantic.ask(GARAGE_QUESTION).await).unwrap();
    let second = serde_json::to_string(&semantic.ask(GARAGE_QUESTION).await).unwrap();
    assert_eq!(first, second);

    let fallback = engine(vec![adu(None), numbered(1, "garage permit")], None);
    let first = serde_json::to_string(&fallback.ask(GARAGE_QUESTION).await).unwrap();
    let second = serde_json::to_string(&fallback.ask(GARAGE_QUESTION).await).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn retrieve_exposes_the_chosen_path() {
    match engine(vec![adu(None)], None).retrieve(GARAGE_QUESTION).await {
        Retrieval::Lexical(matches) => assert_eq!(matches[0].quality, 6),
        other => panic!("expected lexical retrieval, got {other:?}"),
    }
}

#[test]
fn empty_match_lists_render_as_no_match() {
    let config = RetrievalConfig::default();
    for retrieval in [Retrieval::Semantic(vec![]), Retrieval::Lexical(vec![])] {
        let result = retrieval.into_result(&config);
        assert_eq!(result.answer, NO_MATCH_ANSWER);
        assert_eq!(result.retrieval_mode, RetrievalMode::KeywordFallback);
        assert!(result.citations.is_empty());
    }
}

/// Counts a token only when it equals a whole word of the haystack.
struct WholeWordScorer;

impl LexicalScorer for WholeWordScorer {
    fn score(&self, tokens: &[String], section: &CorpusSection) -> u32 {
        let text = format!("{} {} {}", section.tags.join(" "), section.section, section.content).to_lowercase();
        let words: Vec<String> = text.split_whitespace().map(|w| w.trim_matches(|c: char| !c.is_ascii_alphanumeric()).to_string()).collect();
        tokens.iter().filter(|t| words.iter().any(|w| w == *t)).count() as u32
    }
}

#[tokio::test]
async fn keyword_ranker_can_be_swapped_without_touching_the_engine() {
    let planning = CorpusSection {
        id: "planning".to_string(),
        source_title: "City Directory".to_string(),
        source_url: "https://example.gov/directory".to_string(),
        section: "Planning Department".to_string(),
        tags: vec![],
        content: "Contact the department for zoning questions.".to_string(),
        embedding: None,
    };

    let substring = engine(vec![planning.clone()], None).ask("art").await;
    assert_eq!(substring.citations.len(), 1);

    let exact = engine(vec![planning.clone()], None).with_keyword_ranker(KeywordRanker::new(Box::new(WholeWordScorer), 3));
    assert_eq!(exact.ask("art").await.answer, NO_MATCH_ANSWER);
    assert_eq!(exact.ask("zoning").await.citations.len(), 1);
}
