//! Fusion of lexical and dense result lists.
//!
//! BM25 and cosine similarity live on unrelated scales with unrelated
//! distributions, so raw scores are never summed. Each list is min-max
//! normalized to [0,1] over the scores of that list for this query, then
//! combined as `alpha * dense + (1 - alpha) * lexical`, a chunk missing
//! from one side contributing 0 for it. A list with a single distinct
//! score value normalizes to all 1.0.

use std::collections::{BTreeSet, HashMap};

use docrag_core::types::{Chunk, ScoredChunk, SearchHit};

const DEGENERATE_RANGE: f32 = 1e-9;

/// Merge both result lists into one ranking with a single comparable score.
///
/// Sorted by fused score descending, ties broken by chunk_id ascending
/// (ordinal order), truncated to `top_k`. `alpha` = 0 is pure lexical,
/// 1 is pure dense.
pub fn fuse(
    lexical: &[SearchHit],
    dense: &[SearchHit],
    alpha: f32,
    top_k: usize,
    chunks: &[Chunk],
) -> Vec<ScoredChunk> {
    let lexical_raw: HashMap<usize, f32> = lexical.iter().map(|h| (h.ord, h.score)).collect();
    let dense_raw: HashMap<usize, f32> = dense.iter().map(|h| (h.ord, h.score)).collect();
    let lexical_norm = minmax(lexical);
    let dense_norm = minmax(dense);

    let ords: BTreeSet<usize> = lexical_raw.keys().chain(dense_raw.keys()).copied().collect();

    let mut ranked: Vec<(usize, ScoredChunk)> = ords
        .into_iter()
        .map(|ord| {
            let fused_score = alpha * dense_norm.get(&ord).copied().unwrap_or(0.0)
                + (1.0 - alpha) * lexical_norm.get(&ord).copied().unwrap_or(0.0);
            let chunk = &chunks[ord];
            (
                ord,
                ScoredChunk {
                    chunk_id: chunk.chunk_id.clone(),
                    doc_id: chunk.doc_id.clone(),
                    lexical_score: lexical_raw.get(&ord).copied(),
                    dense_score: dense_raw.get(&ord).copied(),
                    fused_score,
                },
            )
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.1.fused_score
            .partial_cmp(&a.1.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.truncate(top_k);
    ranked.into_iter().map(|(_, sc)| sc).collect()
}

/// Min-max normalize one list's scores over that list only.
fn minmax(hits: &[SearchHit]) -> HashMap<usize, f32> {
    if hits.is_empty() {
        return HashMap::new();
    }
    let lo = hits.iter().map(|h| h.score).fold(f32::INFINITY, f32::min);
    let hi = hits.iter().map(|h| h.score).fold(f32::NEG_INFINITY, f32::max);
    if hi - lo < DEGENERATE_RANGE {
        return hits.iter().map(|h| (h.ord, 1.0)).collect();
    }
    hits.iter()
        .map(|h| (h.ord, (h.score - lo) / (hi - lo)))
        .collect()
}
