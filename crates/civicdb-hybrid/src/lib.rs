//! civicdb-hybrid
//!
//! The ask orchestrator: semantic retrieval with keyword fallback and a
//! calibrated confidence label.

pub mod calibrate;
mod engine;

pub use calibrate::{confidence_from_distance, confidence_from_score};
pub use engine::{CivicAskEngine, Retrieval, NO_MATCH_ANSWER};
