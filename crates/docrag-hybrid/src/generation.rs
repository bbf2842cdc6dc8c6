//! Arena-style index generations with atomic publish.
//!
//! A build assembles a complete `IndexGeneration` off to the side; `publish`
//! swaps it in with a single reference update. In-flight searches hold an
//! `Arc` clone of whatever generation was current when they started, so a
//! query can never observe chunks from two different generations.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

use docrag_core::error::{Error, Result};
use docrag_core::filter::{self, Filter};
use docrag_core::types::{Chunk, ChunkId};
use docrag_dense::DenseIndex;
use docrag_lexical::LexicalIndex;

use crate::persist::Manifest;

/// One fully built, immutable snapshot of the corpus and both indexes.
///
/// `chunks` is held in chunk_id-ascending order; a chunk's position is its
/// ordinal, the key both engines score by.
pub struct IndexGeneration {
    pub chunks: Vec<Chunk>,
    pub lexical: LexicalIndex,
    pub dense: DenseIndex,
    pub manifest: Manifest,
    by_id: HashMap<ChunkId, usize>,
    meta_keys: BTreeSet<String>,
}

impl IndexGeneration {
    /// `chunks` must already be sorted by chunk_id and aligned with the
    /// ordinals inside both indexes.
    pub fn new(
        chunks: Vec<Chunk>,
        lexical: LexicalIndex,
        dense: DenseIndex,
        manifest: Manifest,
    ) -> Self {
        let by_id = chunks
            .iter()
            .enumerate()
            .map(|(ord, c)| (c.chunk_id.clone(), ord))
            .collect();
        let meta_keys = chunks
            .iter()
            .flat_map(|c| c.metadata.keys().cloned())
            .collect();
        Self {
            chunks,
            lexical,
            dense,
            manifest,
            by_id,
            meta_keys,
        }
    }

    pub fn id(&self) -> u64 {
        self.manifest.generation
    }

    pub fn ord_of(&self, chunk_id: &str) -> Option<usize> {
        self.by_id.get(chunk_id).copied()
    }

    /// Evaluate the metadata filter into a per-ordinal candidate mask.
    ///
    /// `None` means "everything" (empty filter). A predicate on a metadata
    /// key no chunk in this generation carries is `InvalidFilter`: silently
    /// matching nothing would be indistinguishable from a legitimate empty
    /// corpus slice.
    pub fn candidates(&self, query_filter: &Filter) -> Result<Option<Vec<bool>>> {
        if query_filter.is_empty() {
            return Ok(None);
        }
        for key in query_filter.keys() {
            if !self.meta_keys.contains(key) {
                return Err(Error::InvalidFilter(format!(
                    "unknown metadata key '{key}'"
                )));
            }
        }
        Ok(Some(
            self.chunks
                .iter()
                .map(|c| filter::matches(query_filter, &c.metadata))
                .collect(),
        ))
    }
}

/// Single-writer/multiple-reader holder for the current generation.
#[derive(Default)]
pub struct GenerationStore {
    current: RwLock<Option<Arc<IndexGeneration>>>,
}

impl GenerationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the published generation. Readers that already
    /// hold the previous Arc keep it until they finish.
    pub fn publish(&self, generation: IndexGeneration) -> u64 {
        let id = generation.id();
        let chunks = generation.chunks.len();
        let mut slot = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(generation));
        info!(generation = id, chunks, "published index generation");
        id
    }

    /// The current generation, or `IndexNotBuilt` before the first publish.
    pub fn current(&self) -> Result<Arc<IndexGeneration>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::IndexNotBuilt)
    }

    pub fn latest_id(&self) -> Option<u64> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|g| g.id())
    }
}
