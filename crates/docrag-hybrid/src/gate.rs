//! Evidence sufficiency gate.
//!
//! Decides whether the fused ranking is strong enough to permit a grounded
//! answer. Refusal is a *successful* outcome: the gate returns
//! `Evidence { sufficient: false }` with empty citations and context, never
//! an error, so downstream code can always tell refusal from failure.

use std::collections::HashSet;
use tracing::debug;

use docrag_core::types::{Citation, Evidence, ScoredChunk};

use crate::generation::IndexGeneration;

/// Assemble the final evidence from the fused ranking.
///
/// A chunk counts toward sufficiency when `fused_score >=
/// min_score_threshold` (the boundary is inclusive). When at least
/// `min_evidence_count` chunks qualify, citations are the deduplicated
/// (doc_id, chunk_id) pairs in fused-ranking first-occurrence order, and
/// the context is the concatenation of the qualifying chunk texts, each
/// tagged with its ids so the generation prompt can enforce
/// citation-by-id.
pub fn assemble(
    generation: &IndexGeneration,
    ranked: Vec<ScoredChunk>,
    min_score_threshold: f32,
    min_evidence_count: usize,
) -> Evidence {
    let qualifying: Vec<ScoredChunk> = ranked
        .into_iter()
        .filter(|sc| sc.fused_score >= min_score_threshold)
        .collect();
    let sufficient = qualifying.len() >= min_evidence_count;

    debug!(
        qualifying = qualifying.len(),
        min_evidence_count, sufficient, "evidence gate"
    );

    if !sufficient {
        return Evidence {
            generation: generation.id(),
            chunks: qualifying,
            sufficient: false,
            citations: Vec::new(),
            context: String::new(),
        };
    }

    let mut seen = HashSet::new();
    let mut citations = Vec::new();
    let mut parts = Vec::new();
    for sc in &qualifying {
        if seen.insert((sc.doc_id.clone(), sc.chunk_id.clone())) {
            citations.push(Citation {
                doc_id: sc.doc_id.clone(),
                chunk_id: sc.chunk_id.clone(),
            });
        }
        if let Some(ord) = generation.ord_of(&sc.chunk_id) {
            parts.push(format!(
                "[{}::{}] {}",
                sc.doc_id, sc.chunk_id, generation.chunks[ord].text
            ));
        }
    }

    Evidence {
        generation: generation.id(),
        chunks: qualifying,
        sufficient: true,
        citations,
        context: parts.join("\n\n"),
    }
}
