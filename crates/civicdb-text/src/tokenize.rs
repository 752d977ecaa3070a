//! Question normalization for the keyword path.

/// Common English function words dropped before scoring.
///
/// Words of two characters or fewer never survive the length filter, but are
/// listed anyway so the set reads as a complete stop-word list.
/// Words such as "this", "does" or "your" are not on the list and score like
/// any other token.
pub const STOP_WORDS: [&str; 30] = [
	"a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "how", "i", "if", "in", "is",
	"it", "me", "my", "of", "on", "or", "the", "to", "what", "when", "where", "who", "why", "with",
	"you",
];

fn clean_token(raw: &str) -> String {
	raw.chars()
		.flat_map(char::to_lowercase)
		.filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
		.collect()
}

/// Split on whitespace, lowercase, strip everything outside `[a-z0-9]`, and
/// keep tokens longer than two characters that are not stop words.
///
/// Duplicates are kept; each occurrence counts separately when scored.
pub fn tokenize(text: &str) -> Vec<String> {
	text.split_whitespace()
		.map(clean_token)
		.filter(|token| token.len() > 2 && !STOP_WORDS.contains(&token.as_str()))
		.collect()
}
