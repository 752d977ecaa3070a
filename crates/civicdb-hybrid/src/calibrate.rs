//! Map raw match quality onto the `low | medium | high` bands.

use civicdb_core::config::ConfidenceThresholds;
use civicdb_core::types::Confidence;

/// Higher lexical scores are better.
pub fn confidence_from_score(score: u32, t: &ConfidenceThresholds) -> Confidence {
    if score >= t.lexical_high {
        Confidence::High
    } else if score >= t.lexical_medium {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// Lower distances are better. NaN compares false everywhere and lands on low.
pub fn confidence_from_distance(distance: f64, t: &ConfidenceThresholds) -> Confidence {
    if distance <= t.distance_high {
        Confidence::High
    } else if distance <= t.distance_medium {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}
