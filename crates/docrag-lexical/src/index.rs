//! In-memory inverted index with BM25 scoring.
//!
//! Postings map each term to `(ord, tf)` pairs, where `ord` is the chunk
//! ordinal within one index generation (chunk_id-ascending). Postings are
//! appended in ordinal order at build time, so every list is sorted by
//! chunk_id without a separate sort pass.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use docrag_core::types::{SearchHit, SourceKind};

use crate::tokenize::tokenize;

/// BM25 term-frequency saturation.
pub const K1: f32 = 1.5;
/// BM25 length-normalization strength.
pub const B: f32 = 0.75;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub ord: u32,
    pub tf: u32,
}

/// Immutable once built; one instance per index generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexicalIndex {
    postings: BTreeMap<String, Vec<Posting>>,
    /// Token count per chunk, indexed by ordinal.
    lengths: Vec<u32>,
    avg_len: f32,
}

impl LexicalIndex {
    /// Build postings over chunk texts given in ordinal (chunk_id) order.
    pub fn build<'a, I>(texts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut postings: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
        let mut lengths: Vec<u32> = Vec::new();

        for (ord, text) in texts.into_iter().enumerate() {
            let tokens = tokenize(text);
            lengths.push(tokens.len() as u32);

            let mut counts: BTreeMap<String, u32> = BTreeMap::new();
            for token in tokens {
                *counts.entry(token).or_insert(0) += 1;
            }
            for (term, tf) in counts {
                postings.entry(term).or_default().push(Posting {
                    ord: ord as u32,
                    tf,
                });
            }
        }

        let total: u64 = lengths.iter().map(|&l| u64::from(l)).sum();
        let avg_len = if lengths.is_empty() {
            1.0
        } else {
            (total as f32 / lengths.len() as f32).max(1.0)
        };

        debug!(
            chunks = lengths.len(),
            terms = postings.len(),
            avg_len,
            "built lexical index"
        );
        Self {
            postings,
            lengths,
            avg_len,
        }
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// BM25 search over the candidate set.
    ///
    /// `candidates` is the pre-evaluated metadata filter (by ordinal);
    /// excluded chunks are skipped before scoring, so they can never occupy
    /// a top-k slot. Ties break by ordinal (= chunk_id) ascending. Returns
    /// fewer than `top_k` hits when the filtered corpus is smaller; an
    /// empty result is not an error.
    pub fn search(
        &self,
        query_terms: &[String],
        top_k: usize,
        candidates: Option<&[bool]>,
    ) -> Vec<SearchHit> {
        if top_k == 0 || self.lengths.is_empty() || query_terms.is_empty() {
            return Vec::new();
        }

        let total = self.lengths.len();
        let n = total as f32;
        let mut scores = vec![0.0f32; total];
        let mut matched = vec![false; total];

        for term in query_terms {
            let Some(list) = self.postings.get(term) else {
                continue;
            };
            let df = list.len() as f32;
            // Okapi idf with the +1 shift, always non-negative.
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            for posting in list {
                let ord = posting.ord as usize;
                if let Some(mask) = candidates {
                    if !mask[ord] {
                        continue;
                    }
                }
                let tf = posting.tf as f32;
                let len_norm = 1.0 - B + B * (self.lengths[ord] as f32 / self.avg_len);
                scores[ord] += idf * (tf * (K1 + 1.0)) / (tf + K1 * len_norm);
                matched[ord] = true;
            }
        }

        let mut hits: Vec<SearchHit> = matched
            .iter()
            .enumerate()
            .filter(|&(_, m)| *m)
            .map(|(ord, _)| SearchHit {
                ord,
                score: scores[ord],
                source: SourceKind::Lexical,
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.ord.cmp(&b.ord))
        });
        hits.truncate(top_k);
        hits
    }

    /// Posting list for one term, used by persistence tests and diagnostics.
    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        self.postings.get(term).map(Vec::as_slice)
    }
}
