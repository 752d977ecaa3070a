pub mod rank;
pub mod score;
pub mod tokenize;

pub use rank::KeywordRanker;
pub use score::{LexicalScorer, SubstringScorer};
pub use tokenize::{tokenize, STOP_WORDS};
