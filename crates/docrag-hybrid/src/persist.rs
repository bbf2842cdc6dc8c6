//! On-disk index layout.
//!
//! A saved generation is a directory of `manifest.json`, `chunks.jsonl`,
//! `postings.json` and `vectors.jsonl` (one record per line, in ordinal
//! order). The manifest records the embedding dimensionality, chunking
//! parameters and document version hashes, so a reader can detect a stale
//! or incompatible index at load time instead of silently mis-scoring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

use docrag_core::config::{ChunkingConfig, RetrievalConfig};
use docrag_core::error::{Error, Result};
use docrag_core::types::{Chunk, ChunkId, DocId};
use docrag_dense::DenseIndex;
use docrag_lexical::LexicalIndex;

use crate::generation::IndexGeneration;

pub const FORMAT_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";
const CHUNKS_FILE: &str = "chunks.jsonl";
const POSTINGS_FILE: &str = "postings.json";
const VECTORS_FILE: &str = "vectors.jsonl";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub generation: u64,
    pub created_at: DateTime<Utc>,
    pub embedding_dim: usize,
    pub chunking: ChunkingConfig,
    /// doc_id -> blake3 content hash of the ingested document version.
    pub doc_hashes: BTreeMap<DocId, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VectorRecord {
    chunk_id: ChunkId,
    vector: Vec<f32>,
}

pub fn save(generation: &IndexGeneration, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;

    fs::write(
        dir.join(MANIFEST_FILE),
        serde_json::to_string_pretty(&generation.manifest)?,
    )?;

    let mut chunks_out = BufWriter::new(fs::File::create(dir.join(CHUNKS_FILE))?);
    for chunk in &generation.chunks {
        serde_json::to_writer(&mut chunks_out, chunk)?;
        chunks_out.write_all(b"\n")?;
    }
    chunks_out.flush()?;

    fs::write(
        dir.join(POSTINGS_FILE),
        serde_json::to_string(&generation.lexical)?,
    )?;

    let mut vectors_out = BufWriter::new(fs::File::create(dir.join(VECTORS_FILE))?);
    for (ord, vector) in generation.dense.vectors().iter().enumerate() {
        let record = VectorRecord {
            chunk_id: generation.chunks[ord].chunk_id.clone(),
            vector: vector.clone(),
        };
        serde_json::to_writer(&mut vectors_out, &record)?;
        vectors_out.write_all(b"\n")?;
    }
    vectors_out.flush()?;

    info!(
        generation = generation.id(),
        chunks = generation.chunks.len(),
        dir = %dir.display(),
        "saved index generation"
    );
    Ok(())
}

/// Load a saved generation, rejecting anything stale or incompatible with
/// the running configuration.
pub fn load(dir: &Path, config: &RetrievalConfig) -> Result<IndexGeneration> {
    let manifest: Manifest = serde_json::from_str(&fs::read_to_string(dir.join(MANIFEST_FILE))?)?;

    if manifest.format_version != FORMAT_VERSION {
        return Err(Error::InvalidConfig(format!(
            "unsupported index format version {} (expected {})",
            manifest.format_version, FORMAT_VERSION
        )));
    }
    if manifest.embedding_dim != config.embedding.dim {
        return Err(Error::InvalidConfig(format!(
            "stale index: embedding dimensionality {} differs from configured {}",
            manifest.embedding_dim, config.embedding.dim
        )));
    }
    if manifest.chunking != config.chunking {
        return Err(Error::InvalidConfig(format!(
            "stale index: chunking parameters {:?} differ from configured {:?}",
            manifest.chunking, config.chunking
        )));
    }

    let mut chunks: Vec<Chunk> = Vec::new();
    for line in BufReader::new(fs::File::open(dir.join(CHUNKS_FILE))?).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        chunks.push(serde_json::from_str(&line)?);
    }
    if chunks.windows(2).any(|w| w[0].chunk_id >= w[1].chunk_id) {
        return Err(Error::InvalidConfig(
            "corrupt index: chunk records out of chunk_id order".into(),
        ));
    }

    let lexical: LexicalIndex = serde_json::from_str(&fs::read_to_string(dir.join(POSTINGS_FILE))?)?;

    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
    for (ord, line) in BufReader::new(fs::File::open(dir.join(VECTORS_FILE))?)
        .lines()
        .enumerate()
    {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: VectorRecord = serde_json::from_str(&line)?;
        if chunks.get(ord).map(|c| c.chunk_id.as_str()) != Some(record.chunk_id.as_str()) {
            return Err(Error::InvalidConfig(format!(
                "corrupt index: vector record {ord} does not match chunk order"
            )));
        }
        vectors.push(record.vector);
    }
    if vectors.len() != chunks.len() {
        return Err(Error::InvalidConfig(format!(
            "corrupt index: {} vectors for {} chunks",
            vectors.len(),
            chunks.len()
        )));
    }
    // Stored vectors were normalized at insertion; never renormalize here.
    let dense = DenseIndex::from_stored(manifest.embedding_dim, vectors)?;

    info!(
        generation = manifest.generation,
        chunks = chunks.len(),
        dir = %dir.display(),
        "loaded index generation"
    );
    Ok(IndexGeneration::new(chunks, lexical, dense, manifest))
}
