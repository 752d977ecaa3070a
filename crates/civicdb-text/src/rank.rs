use tracing::debug;

use civicdb_core::config::MAX_RESULTS;
use civicdb_core::types::{CorpusSection, LexicalMatch, RankedMatch};

use crate::score::{LexicalScorer, SubstringScorer};
use crate::tokenize::tokenize;

/// Keyword retrieval over a full corpus scan.
pub struct KeywordRanker {
	scorer: Box<dyn LexicalScorer>,
	limit: usize,
}

impl Default for KeywordRanker {
	fn default() -> Self { Self::new(Box::new(SubstringScorer), MAX_RESULTS) }
}

impl KeywordRanker {
	pub fn new(scorer: Box<dyn LexicalScorer>, limit: usize) -> Self {
		Self { scorer, limit: limit.min(MAX_RESULTS) }
	}

	/// Score every section, drop zero scores, order by descending score and
	/// keep the top `limit`.
	///
	/// Equal scores keep the order in which the corpus listed the sections
	/// (the sort is stable), so identical snapshots rank identically.
	pub fn rank(&self, sections: Vec<CorpusSection>, question: &str) -> Vec<LexicalMatch> {
		let tokens = tokenize(question);
		if tokens.is_empty() {
			debug!("question has no scorable tokens");
			return Vec::new();
		}
		let mut ranked: Vec<LexicalMatch> = sections
			.into_iter()
			.filter_map(|section| {
				let quality = self.scorer.score(&tokens, &section);
				(quality > 0).then_some(RankedMatch { section, quality })
			})
			.collect();
		ranked.sort_by(|a, b| b.quality.cmp(&a.quality));
		ranked.truncate(self.limit);
		debug!(tokens = ?tokens, matches = ranked.len(), "keyword ranking complete");
		ranked
	}
}
