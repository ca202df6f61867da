//! Similarity scoring over stored vectors.

use anyhow::{ensure, Result};

/// Cosine similarity of two equal-length vectors, in [-1, 1].
///
/// Unequal lengths are a programmer error and raise. Zero-norm vectors score
/// 0 rather than dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    ensure!(
        a.len() == b.len(),
        "cosine dimensionality mismatch: {} vs {}",
        a.len(),
        b.len()
    );

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}
