//! docrag-dense
//!
//! Exact nearest-neighbor index over chunk embeddings. Vectors are
//! L2-normalized once at insertion and never renormalized afterwards, so
//! cosine similarity reduces to an inner product at query time. Exact scan
//! is the deliberate default: target corpora fit in memory, which keeps
//! recall exact by construction (no ANN recall bound to tune or document).

use serde::{Deserialize, Serialize};
use tracing::debug;

use docrag_core::error::{Error, Result};
use docrag_core::types::{SearchHit, SourceKind};

/// Immutable once built; one instance per index generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseIndex {
    dim: usize,
    /// Normalized vectors indexed by chunk ordinal.
    vectors: Vec<Vec<f32>>,
}

impl DenseIndex {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("embedding dimension must be positive".into()));
        }
        Ok(Self {
            dim,
            vectors: Vec::new(),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Normalize and store one embedding. Ordinals follow insertion order.
    pub fn insert(&mut self, mut vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                got: vector.len(),
            });
        }
        l2_normalize(&mut vector);
        self.vectors.push(vector);
        Ok(())
    }

    /// Rebuild from persisted vectors, which are already normalized.
    pub fn from_stored(dim: usize, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("embedding dimension must be positive".into()));
        }
        for v in &vectors {
            if v.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    got: v.len(),
                });
            }
        }
        Ok(Self { dim, vectors })
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// Cosine-similarity search over the candidate set, higher is better.
    ///
    /// Same filter discipline as the lexical side: excluded ordinals are
    /// skipped before scoring. Ties break by ordinal (= chunk_id)
    /// ascending.
    pub fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        candidates: Option<&[bool]>,
    ) -> Result<Vec<SearchHit>> {
        if query_vector.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                got: query_vector.len(),
            });
        }
        if top_k == 0 || self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = query_vector.to_vec();
        l2_normalize(&mut query);

        let mut hits: Vec<SearchHit> = self
            .vectors
            .iter()
            .enumerate()
            .filter(|&(ord, _)| candidates.map_or(true, |mask| mask[ord]))
            .map(|(ord, v)| SearchHit {
                ord,
                score: dot(&query, v),
                source: SourceKind::Dense,
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.ord.cmp(&b.ord))
        });
        hits.truncate(top_k);
        debug!(returned = hits.len(), "dense search");
        Ok(hits)
    }
}

fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
