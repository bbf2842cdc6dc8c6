//! The retrieval engine facade.
//!
//! Orchestrates corpus ingestion (chunk, embed, index, publish) and
//! query-time retrieval (filter, search both engines, fuse, gate) over the
//! current published index generation. Stateless across calls beyond the
//! generation store and the embedder handle.

use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use docrag_core::chunker;
use docrag_core::config::RetrievalConfig;
use docrag_core::error::{Error, Result};
use docrag_core::filter::{Filter, MetaValue};
use docrag_core::traits::Embedder;
use docrag_core::types::{Chunk, Document, Evidence, Meta};
use docrag_dense::DenseIndex;
use docrag_lexical::{tokenize, LexicalIndex};

use crate::deadline::Deadline;
use crate::fusion;
use crate::gate;
use crate::generation::{GenerationStore, IndexGeneration};
use crate::persist::{self, Manifest, FORMAT_VERSION};

pub struct RetrievalEngine {
    store: GenerationStore,
    embedder: Box<dyn Embedder>,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(config: RetrievalConfig, embedder: Box<dyn Embedder>) -> Result<Self> {
        config.validate()?;
        if embedder.dim() != config.embedding.dim {
            return Err(Error::InvalidConfig(format!(
                "embedder dimensionality {} differs from configured embedding.dim {}",
                embedder.dim(),
                config.embedding.dim
            )));
        }
        Ok(Self {
            store: GenerationStore::new(),
            embedder,
            config,
        })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Id of the currently published generation, if any.
    pub fn generation(&self) -> Option<u64> {
        self.store.latest_id()
    }

    /// Ingest a corpus directory and publish a fresh index generation.
    ///
    /// The build happens entirely off to the side; concurrent `retrieve`
    /// calls keep the previous generation until the single publish swap.
    /// Idempotent per unchanged document set: re-ingesting the same corpus
    /// with the same parameters yields identical chunk ids and scores.
    pub fn build_index(&self, corpus_dir: &Path) -> Result<u64> {
        let documents = load_corpus(corpus_dir)?;
        if documents.is_empty() {
            warn!(dir = %corpus_dir.display(), "no documents found in corpus");
        }

        let chunking = &self.config.chunking;
        let mut chunks: Vec<Chunk> = Vec::new();
        for document in &documents {
            chunks.extend(chunker::chunk(
                document,
                chunking.max_tokens,
                chunking.overlap_tokens,
            )?);
        }
        // Ordinal order is chunk_id order; both indexes are built against it.
        chunks.sort_by(|a, b| a.chunk_id.cmp(&b.chunk_id));

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;
        let mut dense = DenseIndex::new(self.config.embedding.dim)?;
        for embedding in embeddings {
            dense.insert(embedding)?;
        }
        let lexical = LexicalIndex::build(chunks.iter().map(|c| c.text.as_str()));

        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            generation: self.store.latest_id().unwrap_or(0) + 1,
            created_at: Utc::now(),
            embedding_dim: self.config.embedding.dim,
            chunking: chunking.clone(),
            doc_hashes: documents
                .iter()
                .map(|d| (d.doc_id.clone(), d.content_hash.clone()))
                .collect(),
        };

        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            generation = manifest.generation,
            "built index generation"
        );
        Ok(self
            .store
            .publish(IndexGeneration::new(chunks, lexical, dense, manifest)))
    }

    /// Answer one retrieval query against the current generation.
    ///
    /// Insufficient evidence is a successful `Evidence { sufficient: false }`;
    /// errors are reserved for faults (no index, bad filter, embedding
    /// outage without fallback, expired deadline).
    pub fn retrieve(&self, question: &str, filters: &Filter, deadline: Deadline) -> Result<Evidence> {
        let generation = self.store.current()?;
        let candidates = generation.candidates(filters)?;
        let params = &self.config.retrieval;

        let query_terms = tokenize(question);
        let lexical_hits =
            generation
                .lexical
                .search(&query_terms, params.top_k_lexical, candidates.as_deref());
        deadline.check()?;

        let embedded = self
            .embedder
            .embed_batch(&[question.to_string()])
            .and_then(|mut vectors| {
                vectors
                    .pop()
                    .ok_or_else(|| Error::EmbeddingUnavailable("provider returned no vector".into()))
            });
        let dense_hits = match embedded {
            Ok(query_vector) => {
                generation
                    .dense
                    .search(&query_vector, params.top_k_dense, candidates.as_deref())?
            }
            Err(Error::EmbeddingUnavailable(reason)) if params.lexical_fallback => {
                warn!(%reason, "embedding unavailable; degrading to lexical-only ranking");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        deadline.check()?;

        let ranked = fusion::fuse(
            &lexical_hits,
            &dense_hits,
            params.alpha,
            params.top_k_final,
            &generation.chunks,
        );
        deadline.check()?;

        Ok(gate::assemble(
            &generation,
            ranked,
            self.config.gate.min_score_threshold,
            self.config.gate.min_evidence_count,
        ))
    }

    /// Persist the current generation under `dir`.
    pub fn save_index(&self, dir: &Path) -> Result<()> {
        let generation = self.store.current()?;
        persist::save(&generation, dir)
    }

    /// Load a persisted generation and publish it.
    pub fn load_index(&self, dir: &Path) -> Result<u64> {
        let generation = persist::load(dir, &self.config)?;
        Ok(self.store.publish(generation))
    }
}

/// Load `.txt`/`.md` files under `dir` into documents, in path order.
///
/// `doc_id` is the relative path without extension, so the same filename
/// under two subdirectories stays distinct. Whitespace-only files are
/// skipped with a warning rather than failing the whole ingestion.
fn load_corpus(dir: &Path) -> Result<Vec<Document>> {
    let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            matches!(
                p.extension().and_then(|s| s.to_str()),
                Some("txt") | Some("md")
            )
        })
        .collect();
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let text = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => String::from_utf8_lossy(&fs::read(&path)?).to_string(),
        };
        if text.trim().is_empty() {
            warn!(path = %path.display(), "skipping empty document");
            continue;
        }
        let relative = path.strip_prefix(dir).unwrap_or(&path);
        documents.push(Document {
            doc_id: doc_id_from(relative),
            source_uri: path.to_string_lossy().to_string(),
            ingestion_date: Utc::now(),
            content_hash: blake3::hash(text.as_bytes()).to_hex().to_string(),
            metadata: path_metadata(relative, &path),
            text,
        });
    }
    Ok(documents)
}

fn doc_id_from(relative: &Path) -> String {
    let stem = relative.with_extension("");
    stem.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("_")
}

/// Path-derived metadata: `country` from an uppercase path component
/// (e.g. `FR/conges.txt`), plus the source path and filename.
fn path_metadata(relative: &Path, full: &Path) -> Meta {
    let mut metadata: Meta = BTreeMap::new();
    let country = relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .find(|part| {
            (2..=3).contains(&part.len()) && part.chars().all(|ch| ch.is_ascii_uppercase())
        })
        .unwrap_or("UNKNOWN");
    metadata.insert("country".into(), MetaValue::str(country));
    metadata.insert(
        "source_path".into(),
        MetaValue::str(full.to_string_lossy().to_string()),
    );
    if let Some(stem) = full.file_stem().and_then(|s| s.to_str()) {
        metadata.insert("filename".into(), MetaValue::str(stem));
    }
    metadata
}
