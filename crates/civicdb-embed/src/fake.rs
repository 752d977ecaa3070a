use std::hash::{Hash, Hasher};

use anyhow::{bail, Result};
use async_trait::async_trait;
use twox_hash::XxHash64;

use civicdb_core::traits::EmbedProvider;

/// Hashes lowercased whitespace tokens into buckets and L2-normalizes.
///
/// Texts sharing words land close together, which is enough to exercise the
/// semantic path without a network call. Output is stable across runs.
pub struct FakeEmbedder {
    dim: usize,
    id: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, id: format!("fake:xxhash64:d{}", dim) }
    }

    pub fn embed_sync(&self, text: &str) -> Result<Vec<f32>> {
        if self.dim == 0 {
            bail!("fake embedder configured with zero dimensions");
        }
        let mut v = vec![0f32; self.dim];
        let mut seen = 0usize;
        for (i, token) in text.split_whitespace().enumerate() {
            let token = token.to_lowercase();
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
            seen += 1;
        }
        if seen == 0 {
            bail!("nothing to embed");
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        Ok(v)
    }
}

#[async_trait]
impl EmbedProvider for FakeEmbedder {
    fn embedder_id(&self) -> &str { &self.id }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> { self.embed_sync(text) }
}
