use civicdb_core::types::CorpusSection;

/// Scores one section against a normalized token set. Zero means "no match".
pub trait LexicalScorer: Send + Sync {
	fn score(&self, tokens: &[String], section: &CorpusSection) -> u32;
}

/// Weighted substring containment: `2 * tag_hits + body_hits`.
///
/// A token counts as a hit when it occurs anywhere in the haystack, including
/// inside an unrelated longer word ("art" hits "department"). This imprecision
/// is preserved; swap in another `LexicalScorer` for token-exact matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringScorer;

impl SubstringScorer {
	pub const TAG_WEIGHT: u32 = 2;

	fn count_hits(tokens: &[String], haystack: &str) -> u32 {
		tokens.iter().filter(|t| haystack.contains(t.as_str())).count() as u32
	}
}

impl LexicalScorer for SubstringScorer {
	fn score(&self, tokens: &[String], section: &CorpusSection) -> u32 {
		let tag_text = section.tags.join(" ").to_lowercase();
		let base_text = format!("{} {}", section.section, section.content).to_lowercase();
		Self::TAG_WEIGHT * Self::count_hits(tokens, &tag_text) + Self::count_hits(tokens, &base_text)
	}
}
