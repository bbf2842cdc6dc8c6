//! docrag-embed
//!
//! Embedder implementations behind the `docrag_core::traits::Embedder`
//! seam. The production embedding model is an external collaborator; this
//! crate ships a deterministic feature-hashing embedder good enough for
//! offline operation, tests and air-gapped deployments, where semantic
//! similarity reduces to token overlap.

use std::hash::{Hash, Hasher};
use tracing::info;
use twox_hash::XxHash64;

use docrag_core::error::Result;
use docrag_core::traits::Embedder;

/// Feature-hashing bag-of-tokens embedder.
///
/// Each token is hashed into one of `dim` buckets with a value derived from
/// the hash and a small positional perturbation; the result is
/// L2-normalized. Identical text always embeds to the identical vector.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let mut v = vec![0f32; self.dim];
            for (i, token) in text.split_whitespace().enumerate() {
                let token = token
                    .trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase();
                if token.is_empty() {
                    continue;
                }
                let mut hasher = XxHash64::with_seed(0);
                token.hash(&mut hasher);
                let h = hasher.finish();
                let idx = (h as usize) % self.dim;
                let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
                v[idx] += val + (i as f32 % 3.0) * 0.01;
            }
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
            for x in &mut v {
                *x /= norm;
            }
            out.push(v);
        }
        Ok(out)
    }
}

/// Default embedder for the configured dimensionality.
///
/// There is exactly one built-in provider today; wiring a model-backed
/// provider happens here once one exists, keyed off `APP_EMBED_PROVIDER`.
pub fn get_default_embedder(dim: usize) -> Box<dyn Embedder> {
    info!(dim, "using hashing embedder");
    Box::new(HashEmbedder::new(dim))
}
