//! Domain types shared by the lexical and dense engines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::filter::MetaValue;

pub type ChunkId = String;
pub type DocId = String;
pub type Meta = BTreeMap<String, MetaValue>;

/// An ingested source document.
///
/// Documents are immutable: re-ingesting a changed file produces a new
/// version that shares `doc_id` but carries a different `content_hash`.
/// The previous version is superseded wholesale, never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: DocId,
    pub source_uri: String,
    pub ingestion_date: DateTime<Utc>,
    /// blake3 hex digest of the document text.
    pub content_hash: String,
    pub metadata: Meta,
    pub text: String,
}

/// An addressable span of a document, the unit of retrieval and citation.
///
/// - `chunk_id`: derived deterministically from `doc_id` + span offsets
/// - `token_span`: byte offsets into the owning document's text; the chunk
///   text is the contiguous substring at those offsets
/// - `metadata`: inherited from the document, plus `chunk_index`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub doc_id: DocId,
    pub text: String,
    pub token_span: (usize, usize),
    pub metadata: Meta,
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Lexical,
    Dense,
}

/// The minimal surface returned by both engines.
///
/// `ord` is the chunk ordinal within one index generation; generations keep
/// their chunk table in chunk_id-ascending order, so ordering by `ord` is
/// ordering by chunk_id. `score` is engine-specific but higher is always
/// better.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub ord: usize,
    pub score: f32,
    pub source: SourceKind,
}

/// One fused result. Produced transiently during a retrieval call.
///
/// `lexical_score` / `dense_score` are the raw per-engine scores (absent
/// when that engine did not return the chunk); `fused_score` is the
/// normalized weighted combination used for the final ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: ChunkId,
    pub doc_id: DocId,
    pub lexical_score: Option<f32>,
    pub dense_score: Option<f32>,
    pub fused_score: f32,
}

/// A reference from an answer back to the chunk that supports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub doc_id: DocId,
    pub chunk_id: ChunkId,
}

/// The outcome of one retrieval call, consumed by the generation step.
///
/// When `sufficient` is false the downstream generation step must refuse to
/// answer; `citations` and `context` are empty in that case. `generation`
/// records which published index generation produced this evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub generation: u64,
    pub chunks: Vec<ScoredChunk>,
    pub sufficient: bool,
    pub citations: Vec<Citation>,
    pub context: String,
}
