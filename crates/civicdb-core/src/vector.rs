//! Textual vector literals and cosine distance.
//!
//! Stored embeddings are kept as `[v1,v2,...]` with every value printed to
//! exactly 8 decimal places, the same form a pgvector column accepts. Any
//! store that shares data with an existing deployment must keep this format.

use crate::error::{Error, Result};

pub const LITERAL_PRECISION: usize = 8;

pub fn to_vector_literal(values: &[f32]) -> String {
    let parts: Vec<String> = values
        .iter()
        .map(|&v| {
            // Only an exact negative zero loses its sign; tiny negatives print as -0.00000000.
            let v = if v == 0.0 { 0.0 } else { v };
            format!("{:.*}", LITERAL_PRECISION, v)
        })
        .collect();
    format!("[{}]", parts.join(","))
}

pub fn parse_vector_literal(literal: &str) -> Result<Vec<f32>> {
    let trimmed = literal.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| Error::MalformedVector(format!("missing brackets in '{}'", abbreviate(trimmed))))?;
    if inner.trim().is_empty() {
        return Err(Error::MalformedVector("empty vector".to_string()));
    }
    inner
        .split(',')
        .map(|part| {
            let part = part.trim();
            match part.parse::<f32>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(Error::MalformedVector(format!("bad element '{}'", abbreviate(part)))),
            }
        })
        .collect()
}

/// `1 - cos(a, b)`, matching pgvector's `<=>` operator.
///
/// A zero-norm operand yields NaN; callers order NaN after every real distance.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch { expected: a.len(), actual: b.len() });
    }
    let mut dot = 0f64;
    let mut norm_a = 0f64;
    let mut norm_b = 0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return Ok(f64::NAN);
    }
    // Clamp rounding noise so identical vectors sit at exactly 0.
    Ok((1.0 - dot / denom).clamp(0.0, 2.0))
}

fn abbreviate(s: &str) -> String {
    if s.chars().count() > 32 {
        format!("{}...", s.chars().take(32).collect::<String>())
    } else {
        s.to_string()
    }
}
